use std::path::PathBuf;
use std::time::Instant;

use piper_tts::{
    engines::piper::{PiperEngine, PiperModelParams},
    SynthesisEngine, SynthesisParamsBuilder, VoiceFiles, VoiceName,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let voice = VoiceName::parse(
        &std::env::args()
            .nth(1)
            .unwrap_or_else(|| "en_US-amy-low".to_string()),
    )?;
    let files = VoiceFiles::in_dir(&PathBuf::from("voices"), &voice);
    if !files.exists() {
        println!("Voice files missing. Download them to voices/:");
        println!("  {}", voice.hub_url(&voice.model_file_name()));
        println!("  {}", voice.hub_url(&voice.config_file_name()));
        return Ok(());
    }

    let mut engine = PiperEngine::new();
    let load_start = Instant::now();
    engine.load_model_with_params(
        &files.model,
        PiperModelParams {
            config_path: Some(files.config.clone()),
            ..Default::default()
        },
    )?;
    println!("Voice {voice} loaded in {:.2?}", load_start.elapsed());
    println!("Speakers: {:?}", engine.list_speakers());

    let text = "Hello! This is a Piper voice, synthesized from Rust.";

    let synth_start = Instant::now();
    let audio = engine.synthesize(text, None)?;
    let synth_dur = synth_start.elapsed();
    println!(
        "Synthesized {:.2}s audio in {:.2?} ({:.1}x real-time)",
        audio.duration_secs(),
        synth_dur,
        audio.duration_secs() / synth_dur.as_secs_f64()
    );
    audio.write_to_file(&PathBuf::from("output.wav"))?;
    println!("Saved to output.wav");

    let slow = SynthesisParamsBuilder::default().length_scale(1.4).build()?;
    engine.synthesize_to_file(text, &PathBuf::from("output_slow.wav"), Some(slow))?;
    println!("Saved to output_slow.wav");

    engine.unload_model();
    Ok(())
}
