use std::path::PathBuf;
use std::time::Instant;

use mora_tts::engines::sharevox::{SharevoxEngine, SharevoxModelParamsBuilder};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let root = PathBuf::from(args.next().unwrap_or_else(|| "model".to_string()));
    let speaker_id: i64 = args.next().map(|s| s.parse()).transpose()?.unwrap_or(0);
    let kana = args
        .next()
        .unwrap_or_else(|| "コンニチワ'、オゲ'ンキデスカ？".to_string());

    let mut engine = SharevoxEngine::new();
    println!("Supported devices: {}", engine.supported_devices().to_json());

    let load_start = Instant::now();
    let params = SharevoxModelParamsBuilder::default()
        .load_all_models(false)
        .build()?;
    engine.initialize(&root, params)?;
    engine.load_model(speaker_id)?;
    println!("Model loaded in {:.2?}", load_start.elapsed());
    println!("Speakers: {}", engine.metas()?);

    let synth_start = Instant::now();
    let wav = engine.tts_from_kana(&kana, speaker_id)?;
    println!(
        "Synthesized {} bytes of WAV in {:.2?}",
        wav.len(),
        synth_start.elapsed()
    );

    std::fs::write("output.wav", &wav)?;
    println!("Saved to output.wav");

    engine.finalize();
    Ok(())
}
