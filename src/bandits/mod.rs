// Bandits module - identification engine
// Bandit definitions, tri-state identifiers, and in-memory contact tracking

mod bandit;
mod defaults;
mod engine;
mod identifiers;

pub use bandit::{Bandit, BanditId};

pub use identifiers::{
    // Core trait
    BanditIdentifier,
    // Descriptor types
    IdentifierDescriptor, IdentifierKind,
    // Concrete identifiers
    FingerprintIdentifier, SsidIdentifier, VendorIdentityIdentifier,
};

pub use engine::{Contact, ContactEngine, ContactEvent, ACTIVE_CONTACT_MINUTES};

pub use defaults::built_in_bandits;
