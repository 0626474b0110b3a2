// CLI smoke tests
//
// Exercise argument handling and the commands that need neither a browser
// nor a dev server.

use std::process::Command;

fn bin() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_araucaria-verify"));
    // Keep host configuration out of the tests
    for var in [
        "ARAUCARIA_BASE_URL",
        "ARAUCARIA_PORT",
        "ARAUCARIA_SERVER_CMD",
        "ARAUCARIA_BROWSER",
        "ARAUCARIA_LOG_FORMAT",
        "ARAUCARIA_READY_TIMEOUT",
    ] {
        cmd.env_remove(var);
    }
    cmd
}

#[test]
fn test_list_shows_every_scenario() {
    let output = bin().arg("list").output().expect("run list");
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    for name in [
        "hero-search",
        "booking-flow",
        "payment-flow",
        "promo-message",
        "payment-code",
        "legal-modals",
        "destination-images",
        "product-purchase",
        "hero-titles",
        "round-trip-discount",
    ] {
        assert!(stdout.contains(name), "missing {} in:\n{}", name, stdout);
    }
}

#[test]
fn test_unknown_scenario_fails() {
    let output = bin()
        .args(["run", "does-not-exist"])
        .output()
        .expect("run unknown scenario");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("does-not-exist"), "stderr:\n{}", stderr);
}

#[test]
fn test_run_requires_a_scenario() {
    let output = bin().arg("run").output().expect("run without args");
    assert!(!output.status.success());
}

#[test]
fn test_invalid_browser_is_rejected() {
    let output = bin()
        .args(["--browser", "lynx", "list"])
        .output()
        .expect("run with bad browser");
    assert!(!output.status.success());
}

#[cfg(unix)]
#[test]
fn test_boot_check_reports_port() {
    let output = bin()
        .args([
            "boot-check",
            "--server-cmd",
            "echo '  VITE v5.4.0  ready in 12 ms'; echo '  Local:   http://localhost:5199/'; sleep 30",
            "--ready-timeout",
            "10",
        ])
        .output()
        .expect("run boot-check");
    assert!(output.status.success(), "stderr:\n{}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("port 5199"), "stdout:\n{}", stdout);
}

#[cfg(unix)]
#[test]
fn test_boot_check_fails_when_server_exits() {
    let output = bin()
        .args([
            "boot-check",
            "--server-cmd",
            "echo 'npm ERR! missing script: dev' >&2; exit 1",
            "--ready-timeout",
            "10",
        ])
        .output()
        .expect("run boot-check");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("missing script"), "stderr:\n{}", stderr);
}
