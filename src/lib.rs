// foxhunt - wireless IDS core
// Bandit identification engine and the encrypted tracker link carrying it

pub mod bandits;
pub mod dot11;
pub mod link;
