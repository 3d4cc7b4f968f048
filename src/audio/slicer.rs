use crate::types::{AudioChunk, AudioData};

/// Cuts audio into consecutive chunks of at most `chunk_ms`. The last chunk
/// carries the remainder; empty audio yields no chunks.
pub fn split_into_chunks(audio: &AudioData, chunk_ms: u64) -> Vec<AudioChunk> {
    if audio.samples.is_empty() || audio.sample_rate == 0 || chunk_ms == 0 {
        return Vec::new();
    }
    let chunk_samples = ((audio.sample_rate as u64 * chunk_ms) / 1000).max(1) as usize;

    audio
        .samples
        .chunks(chunk_samples)
        .enumerate()
        .map(|(index, samples)| AudioChunk {
            index,
            samples: samples.to_vec(),
            sample_rate: audio.sample_rate,
            offset_ms: (index * chunk_samples) as u64 * 1000 / audio.sample_rate as u64,
        })
        .collect()
}
