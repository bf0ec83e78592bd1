//! rfacelog main entrypoint.

use rfacelog::run;

fn main() {
    if let Err(e) = run() {
        rfacelog::ui::messages::error(format!("Error: {}", e));
        std::process::exit(1);
    }
}
