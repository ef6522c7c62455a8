use loopsonic::stream::decode_f32_le;
use loopsonic::{LoopPoints, LoopSonicEvent, LoopStreamProvider, StreamProvider};
use std::io::Read;
use std::path::Path;

const FRAMES: i16 = 100;

/// Mono 16-bit ramp where frame `i` holds the sample value `i * 100`.
fn write_ramp(path: &Path) {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 8000,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).unwrap();
    for i in 0..FRAMES {
        writer.write_sample(i * 100).unwrap();
    }
    writer.finalize().unwrap();
}

fn frames(range: std::ops::Range<i16>) -> Vec<f32> {
    range.map(|i| (i * 100) as f32 / 32768.0).collect()
}

fn drain(stream: &loopsonic::LoopStream<loopsonic::PcmSource>) -> Vec<f32> {
    let mut bytes = Vec::new();
    let mut reader = stream;
    reader.read_to_end(&mut bytes).unwrap();

    let mut samples = vec![0.0f32; bytes.len() / 4];
    decode_f32_le(&bytes, &mut samples);
    samples
}

#[test]
fn test_provider_plays_intro_loop_and_outro() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ramp.wav");
    write_ramp(&path);

    let points = LoopPoints::new()
        .track_start(10)
        .loop_start(20)
        .loop_end(40)
        .track_end(90)
        .loops(1);
    let provider = StreamProvider::from(LoopStreamProvider::new(&path).with_points(points));
    assert_eq!(provider.path(), path.as_path());

    let stream = provider.create_stream().unwrap();
    let events = stream.subscribe(4);
    assert_eq!(stream.format().sample_rate, 8000);
    assert_eq!(stream.len(), 80 * 4);

    let mut want = frames(10..40);
    want.extend(frames(20..90));
    assert_eq!(drain(&stream), want);
    assert_eq!(events.try_iter().collect::<Vec<_>>(), vec![LoopSonicEvent::Looped]);
}

#[test]
fn test_copied_provider_creates_independent_streams() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ramp.wav");
    write_ramp(&path);

    let provider = StreamProvider::from(
        LoopStreamProvider::new(&path).with_points(LoopPoints::new().track_start(50).loops(0)),
    );
    let copy = provider.clone();

    let first = provider.create_stream().unwrap();
    let second = copy.create_stream().unwrap();
    assert_eq!(drain(&first), frames(50..100));

    // Draining one stream leaves the other at its start.
    assert_eq!(second.position().unwrap(), 0);
    assert_eq!(drain(&second), frames(50..100));
}

#[test]
fn test_out_of_order_points_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ramp.wav");
    write_ramp(&path);

    let provider = LoopStreamProvider::new(&path)
        .with_points(LoopPoints::new().loop_start(60).loop_end(30));
    assert!(matches!(
        provider.create_stream(),
        Err(loopsonic::LoopSonicError::InvalidConfiguration(_))
    ));
}
