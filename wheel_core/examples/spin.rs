use wheel_core::{
    draw_full_spins, landing_rotation, spin_with_seeds, OsEntropy, SpinSeeds, SystemClock,
    WheelConfig,
};

fn main() {
    // One end-to-end spin with fresh seeds, printed for manual verification
    let entropy = OsEntropy;
    let seeds = SpinSeeds::generate(&entropy, &SystemClock);
    let config = WheelConfig::default();
    let outcome = spin_with_seeds(seeds, &config);
    let rotation = landing_rotation(0.0, outcome.landing_segment, draw_full_spins(&entropy), &config);
    println!(
        "combined={} hash={} roll={} win={} segment={} rotation={}",
        outcome.seeds.combined(),
        outcome.hash,
        outcome.roll,
        outcome.is_win,
        outcome.landing_segment,
        rotation
    );
}
