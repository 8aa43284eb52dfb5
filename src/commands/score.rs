//! Score command - report cover quality.

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Args;

use stegcore::score::score_cover;

use super::{fmt_bytes, CommandExecutor};

/// Analyse a cover image and report its steganographic quality score.
///
/// Higher entropy and texture density leave more eligible slots and make
/// embedding harder to detect.
#[derive(Args, Debug)]
pub struct ScoreCommand {
    /// Cover image to analyse (PNG, BMP, JPEG)
    pub image: PathBuf,
}

impl CommandExecutor for ScoreCommand {
    fn execute(&self) -> Result<()> {
        if !self.image.is_file() {
            bail!("file not found: {}", self.image.display());
        }

        let report = score_cover(&self.image)?;

        println!("Score:               {}/100 - {}", report.score, report.label.name());
        println!("Dimensions:          {} x {} px", report.width, report.height);
        println!("Entropy:             {:.2} / 8.00 bits", report.entropy);
        println!("Texture density:     {:.1}%", report.texture_density * 100.0);
        println!("Adaptive capacity:   {}", fmt_bytes(report.adaptive_capacity));
        println!("Sequential capacity: {}", fmt_bytes(report.sequential_capacity));

        match report.score {
            0..=34 => println!("Poor cover choice - try a larger or more complex image."),
            35..=54 => println!("Usable, but a higher-entropy cover is recommended."),
            _ => println!("Good cover image."),
        }
        Ok(())
    }
}
