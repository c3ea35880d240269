//! Command-line output checks against the built binary

use std::process::Command;

#[test]
fn scan_json_is_the_only_stdout() {
    let home = tempfile::tempdir().unwrap();
    let output = Command::new(env!("CARGO_BIN_EXE_scalerkit"))
        .args(["scan", "--json", "--refresh"])
        .env("HOME", home.path())
        .env_remove("SCALERKIT_XDG_PATH")
        .env_remove("SCALERKIT_QUIET")
        .output()
        .unwrap();

    assert!(output.status.success());
    let games: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert!(games.is_array());
    // Log lines still reach the console
    assert!(String::from_utf8_lossy(&output.stderr).contains("[INFO]"));
}

#[test]
fn added_folder_is_scanned() {
    let home = tempfile::tempdir().unwrap();
    let library = home.path().join("library");
    std::fs::create_dir_all(library.join("Alpha")).unwrap();
    std::fs::File::create(library.join("Alpha/Alpha.exe"))
        .unwrap()
        .set_len(1024)
        .unwrap();

    let run = |args: &[&str]| {
        Command::new(env!("CARGO_BIN_EXE_scalerkit"))
            .args(args)
            .env("HOME", home.path())
            .env_remove("SCALERKIT_XDG_PATH")
            .output()
            .unwrap()
    };

    let library_arg = library.to_string_lossy().to_string();
    assert!(run(&["folder", "add", &library_arg]).status.success());
    let listed = run(&["folder", "list"]);
    assert!(String::from_utf8_lossy(&listed.stdout).contains(&library_arg));

    let output = run(&["scan", "--json", "--refresh"]);
    let games: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let names: Vec<&str> = games
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|g| g["display_name"].as_str())
        .collect();
    assert!(names.contains(&"Alpha"));

    assert!(run(&["folder", "remove", &library_arg]).status.success());
    assert!(!run(&["folder", "remove", &library_arg]).status.success());
}
