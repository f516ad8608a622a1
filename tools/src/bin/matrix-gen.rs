//! Generates lua/matrix_color_number.lua from the records in lua/test.lua.

use assetconv::convert;
use std::fs;
use std::path::Path;
use std::process;

fn main() {
    let input = Path::new(convert::MATRIX_INPUT);
    if let Some(dir) = input.parent() {
        if let Err(err) = fs::create_dir_all(dir) {
            eprintln!("Error creating {}: {}", dir.display(), err);
            process::exit(1);
        }
    }
    if !input.exists() {
        println!("Error: {} file not found!", convert::MATRIX_INPUT);
        process::exit(1);
    }

    match convert::generate_matrix_file(input, Path::new(convert::MATRIX_OUTPUT)) {
        Ok(count) => {
            println!("Successfully processed {} color patterns.", count);
            println!(
                "Generated {} with {{x, y, color}} point entries.",
                convert::MATRIX_OUTPUT
            );
        }
        Err(err) => {
            eprintln!("Error: {}", err);
            process::exit(1);
        }
    }
}
