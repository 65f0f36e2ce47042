//! Currency command - show the currency table

use anyhow::Result;
use redsys_lib::currency;

use crate::ui;

pub fn run(code: Option<&str>) -> Result<()> {
    match code {
        Some(code) => {
            let numeric = currency::to_numeric_code(code)?;
            ui::key_value(code, numeric);
        }
        None => {
            ui::header("Supported Currencies");
            for (alpha, numeric) in currency::supported_currencies() {
                ui::key_value(alpha, numeric);
            }
            ui::separator();
            ui::info(&format!(
                "{} currencies",
                currency::supported_currencies().len()
            ));
        }
    }
    Ok(())
}
