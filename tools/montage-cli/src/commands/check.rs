//! Check that the media backend is usable.

use montage_common::AppConfig;
use montage_render_engine::{FfmpegBackend, MediaBackend};

pub fn run(config: &AppConfig) -> anyhow::Result<()> {
    println!("Montage System Check");
    println!("{}", "=".repeat(50));

    let backend = FfmpegBackend::new(config.backend.clone());
    println!("  ffmpeg:  {}", config.backend.ffmpeg);
    println!("  ffprobe: {}", config.backend.ffprobe);
    println!("  preset:  {}", config.backend.video_preset);
    println!("  temp:    {}", config.render.temp_root().display());

    println!();
    if backend.is_available() {
        println!("[OK] Backend: {}", backend.name());
        println!("\nMontage is ready to render.");
        Ok(())
    } else {
        println!("[MISSING] Backend: {}", backend.name());
        anyhow::bail!("ffmpeg/ffprobe could not be executed")
    }
}
