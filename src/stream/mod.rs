pub(crate) mod binary_reader;
pub(crate) mod binary_writer;
pub(crate) mod xml_reader;
pub(crate) mod xml_writer;

/// Seconds between the Unix epoch and the Core Foundation epoch (2001-01-01).
pub(crate) const MAC_EPOCH: f64 = 978_307_200.0;
