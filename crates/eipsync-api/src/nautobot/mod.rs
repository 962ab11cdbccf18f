// Nautobot REST client modules
//
// Only the IPAM surface the sync job touches: IP addresses and prefixes,
// with status and namespace referenced by name.

pub mod client;
pub mod models;

pub use client::NautobotClient;
pub use models::{
    IpAddressPatch, IpAddressRecord, IpAddressWrite, NameRef, Page, PrefixPatch, PrefixRecord,
    PrefixWrite, StatusRef,
};
