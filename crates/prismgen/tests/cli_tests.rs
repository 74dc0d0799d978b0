use assert_cmd::Command;

#[test]
fn missing_arguments_exit_nonzero() {
    let mut cmd = Command::cargo_bin("prismgen").unwrap();
    cmd.assert().failure();
}

#[test]
fn unreadable_wall_mesh_exits_nonzero() {
    let mut cmd = Command::cargo_bin("prismgen").unwrap();
    cmd.arg("/nonexistent/wall.stl");
    cmd.assert().failure();
}

#[test]
fn malformed_config_is_rejected() {
    let dir = std::env::temp_dir().join(format!("prismgen-cli-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let cfg = dir.join("bad.cfg");
    std::fs::write(&cfg, "this line has no equals sign\n").unwrap();
    let wall = dir.join("wall.stl");
    std::fs::write(&wall, "").unwrap();

    let mut cmd = Command::cargo_bin("prismgen").unwrap();
    cmd.arg(&wall).arg(&cfg);
    cmd.assert().failure();
    std::fs::remove_dir_all(&dir).ok();
}
