// Built-in Bandit Definitions
// Fingerprints of commonly encountered attack platforms, seeded at startup

use crate::bandits::bandit::{Bandit, BanditId};
use crate::bandits::identifiers::FingerprintIdentifier;
use sha2::{Digest, Sha256};

// Name, description, beacon/probe-response fingerprint. IDs are derived from
// the fingerprint, so they stay stable across releases and re-seeds.
const BUILT_IN: &[(&str, &str, &str)] = &[
    (
        "WiFi Pineapple Nano, Tetra or Mark VII (PineAP), esp8266_deauther",
        "PineAP frames and esp8266_deauther frames, which share a fingerprint.",
        "ec398735dc99267d453908d81bfe06ce04cfa2573d0b9edf1d940f0dbf850a9c",
    ),
    (
        "WiFi Pineapple Tetra (PineAP)",
        "Pineapple Tetra v2.5.2, but other firmware versions might match, too.",
        "535afea1f1656375a991e28ce919d412fd9863a01f1b0b94fcff8a83ed8fcb83",
    ),
    (
        "WiFi Pineapple Nano (management access point)",
        "Pineapple Nano v2.5.2, but other firmware versions might match, too.",
        "e1a3923e4a513e2e1040763ad0b97746a84add27d559a84e4af3b313c69bfb26",
    ),
    (
        "WiFi Pineapple Nano (management access point)",
        "Pineapple Nano v2.5.2, but other firmware versions might match, too.",
        "af59f355d6885a77c85324147e2f29c48b170f5ebad107beafbadc48d1dc491f",
    ),
    (
        "WiFi Pineapple Nano (public access point)",
        "Pineapple Nano v2.5.2, but other firmware versions might match, too.",
        "147a503d849b148738bf66dcb7aea39c0c08f54cbd5edd47e39efe47d6fd582e",
    ),
    (
        "WiFi Pineapple Tetra (management access point)",
        "Pineapple Tetra v1.1.2, but other firmware versions might match, too.",
        "dacf284b8a079fc61c795a2441672baff055890f106b3f75621ab1e00c518273",
    ),
    (
        "WiFi Pineapple Tetra (management access point)",
        "Pineapple Tetra v2.5.2, but other firmware versions might match, too.",
        "78ad585d15e4372299c6da1175c6e126d00face9452ea2741cae240fb1d6d6f2",
    ),
    (
        "WiFi Pineapple Tetra (public access point)",
        "Pineapple Tetra v1.1.2, but other firmware versions might match, too.",
        "32f5dc405a16936a40a23153e91cad67cbe813f45188d1b36e58e8405b9adaef",
    ),
    (
        "WiFi Pineapple Tetra (public access point)",
        "Pineapple Tetra v2.5.2, but other firmware versions might match, too.",
        "7664c29afd9f6b83915235013a3ce628a13e9e6eba9530fe42c466b987270676",
    ),
    (
        "WiFi Pineapple Tetra (public access point)",
        "Pineapple Tetra v2.5.2, but other firmware versions might match, too.",
        "99255ad871a842cfcf972b069728501ea31583b56e7692cc6abe3334c2846528",
    ),
    (
        "WiFi Pineapple Tetra (public access point)",
        "Pineapple Tetra v2.7.0, but other firmware versions might match, too.",
        "e6679e0fb62c0efd80f1e39c1cbb7f239edc0d7f601fbb9a22d14f2eb31c0266",
    ),
    (
        "WiFi Pineapple Tetra (management access point)",
        "Pineapple Tetra v2.5.2, but other firmware versions might match, too.",
        "e643cd336d483cdfb7e3c0912e262dd21e6bbbc67a72bccd47214f67373d8ab4",
    ),
    (
        "WiFi Pineapple Tetra (management access point)",
        "Pineapple Tetra v2.7.0, but other firmware versions might match, too.",
        "8265dd9864d2b9a35c2742d8e9180db7c520169ab4e06977ae7651f3a574331a",
    ),
    (
        "spacehuhn/esp8266_deauther (management access point)",
        "esp8266_deauther management access point.",
        "29007c66ed8091c2c8d6060915da22560bc56b81be40085a04515be87dfe538a",
    ),
    (
        "wifiphisher",
        "wifiphisher rogue access point frames.",
        "4d2c7aeb85869ef12a92d39754ebdbfb101bebf4224cc055ee89b96c9f41ee3b",
    ),
    (
        "WiFi Pineapple Mark VII (management access point)",
        "Pineapple Mark VII v1.0.2, but other firmware versions might match, too.",
        "52e13d95488261db15fa486a107a5ee5dbf14affa652e928b31dca4c245be6e6",
    ),
    (
        "WiFi Pineapple Mark VII (public access point)",
        "Pineapple Mark VII v1.0.2, but other firmware versions might match, too.",
        "609406d11b6d0398a830142b9ae5c24f59640cf3f02887fe2dc351e056846bb4",
    ),
];

/// Build the catalog of built-in bandit definitions
pub fn built_in_bandits() -> Vec<Bandit> {
    BUILT_IN
        .iter()
        .map(|(name, description, fingerprint)| {
            Bandit::built_in(stable_id(fingerprint), name, description)
                .with_identifier(Box::new(FingerprintIdentifier::new(fingerprint)))
        })
        .collect()
}

fn stable_id(fingerprint: &str) -> BanditId {
    let digest = Sha256::digest(fingerprint.as_bytes());
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&digest[..16]);
    BanditId::from_bytes(bytes)
}
