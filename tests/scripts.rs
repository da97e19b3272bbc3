use std::{
    fs,
    io::{stdout, Write},
};

use luigi_lang::{Error, Function, Luigi, Value};

fn assert_native() -> Function {
    Function::native("assert", &["condition", "message"], |_, args| {
        if args[0].is_truthy() {
            Ok(Value::Null)
        } else {
            Err(Error::native(format!("assertion failed: {}", args[1])))
        }
    })
}

#[test]
fn test_scripts() {
    const DIR: &str = "./tests/scripts";
    let _ = writeln!(stdout(), "running all test scripts in {:?}", DIR);
    for dir in fs::read_dir(DIR).expect("could not list dir") {
        let path = dir.expect("could not read dir entry").path();
        if path.extension().is_some_and(|ext| ext == "luigi") {
            let input = fs::read_to_string(&path).expect("could not read file contents");
            let _ = writeln!(stdout(), "running {:?}", path.file_name().unwrap());
            let mut luigi = Luigi::new();
            luigi.register_function(assert_native());
            if let Err(err) = luigi.run_code(&input) {
                panic!("error encountered running {:?}: {}", path, err);
            }
        } else {
            let _ = writeln!(stdout(), "skipping file {:?}", path);
        }
    }
}
