/// Tempo map and seconds ↔ ticks conversion.
pub mod tempo;
