//! Environment readiness check.

use crate::session::chromium::find_chromium;
use anyhow::Result;

/// Check Chromium availability and working-directory writability.
pub async fn run() -> Result<()> {
    println!("factfetch doctor");
    println!("================");
    println!();

    let os = std::env::consts::OS;
    let arch = std::env::consts::ARCH;
    println!("OS:   {os}");
    println!("Arch: {arch}");
    println!();

    // Chromium
    let chromium_path = find_chromium();
    match &chromium_path {
        Some(path) => println!("[OK] Chromium found: {}", path.display()),
        None => println!(
            "[!!] Chromium NOT found. Install Chrome/Chromium or set FACTFETCH_CHROMIUM_PATH."
        ),
    }

    // Download directory writability
    let cwd = std::env::current_dir()?;
    let probe = cwd.join(".factfetch-doctor-probe");
    match std::fs::write(&probe, b"ok") {
        Ok(()) => {
            let _ = std::fs::remove_file(&probe);
            println!("[OK] Working directory is writable: {}", cwd.display());
        }
        Err(e) => println!("[!!] Working directory not writable: {e}"),
    }

    println!();
    if chromium_path.is_some() {
        println!("Status: READY");
    } else {
        println!("Status: NOT READY");
    }

    Ok(())
}
