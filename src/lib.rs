pub mod cache;
pub mod error;
pub mod lru;
pub mod ordered;
pub mod simulation;
pub mod trace;

#[cfg(all(target_arch = "wasm32", target_os = "unknown"))]
use wasm_bindgen::prelude::*;

#[cfg(all(target_arch = "wasm32", target_os = "unknown"))]
#[wasm_bindgen]
pub fn run_simulation(input: &str, set_bits: u32, lines: usize, block_bits: u32) -> String {
    use cache::Geometry;
    use lru::LruCache;
    use simulation::{Simulator, UnknownOps};

    let geometry = match Geometry::from_bits(set_bits, lines, block_bits) {
        Ok(geometry) => geometry,
        Err(e) => return format!("invalid cache geometry: {e}"),
    };

    let mut simulator = Simulator::new(LruCache::new(geometry), UnknownOps::Ignore);
    let tally = simulator.replay(trace::Trace::new(input), |_, _| {});

    [geometry.format_info(), tally.to_string()].join("\n")
}
