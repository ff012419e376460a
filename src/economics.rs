/// Economics module: block reward schedule

/// Base units per coin.
pub const COIN: u64 = 100_000_000;

const INITIAL_REWARD: u64 = 50 * COIN;
const HALVING_INTERVAL: u64 = 210_000;

/// Reward a block at `height` may issue through its coinbase, before fees.
pub fn coinbase_reward(height: u64) -> u64 {
    let halvings = height / HALVING_INTERVAL;
    if halvings >= 64 {
        0
    } else {
        INITIAL_REWARD >> halvings
    }
}
