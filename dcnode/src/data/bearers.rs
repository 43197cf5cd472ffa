use anyhow::{Result, bail, ensure};
use hex::FromHex;
use pdcp::SplitPolicy;
use serde::{Deserialize, Deserializer};
use slog::{Logger, error, info};
use std::collections::BTreeMap;
use std::fs;
use std::net::{IpAddr, SocketAddr};

/// A bearer to set up on the node.
#[derive(Debug, Clone, PartialEq)]
pub struct BearerSpec {
    /// Local TEID.  Keys F1-U traffic from the DU and DCX traffic from the peer.
    /// Allocated by the node if not given.
    pub teid: Option<u32>,
    pub rnti: u16,
    pub lcid: u8,
    /// TEID the DU expects on F1-U packets for this bearer.
    pub du_teid: u32,
    pub dual_connectivity: bool,
    pub in_sequence_delivery: bool,
    pub split_policy: SplitPolicy,
    pub peer: Option<PeerSpec>,
    /// UDP port on the node's address.  Each datagram received is one SDU to transmit.
    pub sdu_port: Option<u16>,
    /// Where to send received SDUs, one per datagram.
    pub deliver_to: Option<SocketAddr>,
}

/// The other end of the DCX tunnel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeerSpec {
    pub ip_addr: IpAddr,
    pub teid: u32,
    pub rnti: u16,
}

impl BearerSpec {
    /// A bearer with no remote leg.
    pub fn local(rnti: u16, lcid: u8, du_teid: u32) -> Self {
        BearerSpec {
            teid: None,
            rnti,
            lcid,
            du_teid,
            dual_connectivity: false,
            in_sequence_delivery: true,
            split_policy: SplitPolicy::default(),
            peer: None,
            sdu_port: None,
            deliver_to: None,
        }
    }

    /// A split bearer using alternate routing.
    pub fn split(rnti: u16, lcid: u8, du_teid: u32, peer: PeerSpec) -> Self {
        BearerSpec {
            dual_connectivity: true,
            peer: Some(peer),
            ..Self::local(rnti, lcid, du_teid)
        }
    }
}

#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
struct BearerEntry {
    #[serde(default, deserialize_with = "optional_teid")]
    teid: Option<[u8; 4]>,
    rnti: u16,
    lcid: u8,
    #[serde(with = "hex")]
    du_teid: [u8; 4],
    dual_connectivity: Option<bool>,
    #[serde(default = "in_sequence_default")]
    in_sequence_delivery: bool,
    #[serde(default)]
    split_policy: PolicyEntry,
    peer: Option<PeerEntry>,
    sdu_port: Option<u16>,
    deliver_to: Option<SocketAddr>,
}

#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
struct PeerEntry {
    ip: IpAddr,
    #[serde(with = "hex")]
    teid: [u8; 4],
    rnti: u16,
}

#[derive(Deserialize, Debug, Default, Clone, Copy)]
#[serde(rename_all = "kebab-case")]
enum PolicyEntry {
    #[default]
    Alternate,
    LocalOnly,
    RemoteOnly,
}

impl From<PolicyEntry> for SplitPolicy {
    fn from(policy: PolicyEntry) -> Self {
        match policy {
            PolicyEntry::Alternate => SplitPolicy::Alternate,
            PolicyEntry::LocalOnly => SplitPolicy::LocalOnly,
            PolicyEntry::RemoteOnly => SplitPolicy::RemoteOnly,
        }
    }
}

fn in_sequence_default() -> bool {
    true
}

fn optional_teid<'de, D: Deserializer<'de>>(d: D) -> Result<Option<[u8; 4]>, D::Error> {
    let Some(s) = Option::<String>::deserialize(d)? else {
        return Ok(None);
    };
    <[u8; 4]>::from_hex(s)
        .map(Some)
        .map_err(serde::de::Error::custom)
}

/// Load the bearer table from file.
pub fn load_bearers_file(filename: &str, logger: &Logger) -> Result<Vec<BearerSpec>> {
    let path = std::env::current_dir()?;
    let contents = fs::read_to_string(filename).inspect_err(|e| {
        error!(
            logger,
            "Failed to load bearer file {filename} (current directory {}) with error code {e}",
            path.display()
        )
    })?;
    parse_bearers(&contents, filename, logger)
}

pub fn parse_bearers(contents: &str, source: &str, logger: &Logger) -> Result<Vec<BearerSpec>> {
    let table: BTreeMap<String, BearerEntry> = toml::from_str(contents)?;
    let mut bearers = vec![];
    for (key, entry) in table.into_iter() {
        let Some(name) = key.strip_prefix("bearer-") else {
            bail!("Key {} in {source} does not start with 'bearer-'", key)
        };
        let bearer = validate(entry).map_err(|e| e.context(format!("Bearer {name} in {source}")))?;
        info!(
            logger,
            "Loaded bearer {name} rnti {} lcid {} from {source}", bearer.rnti, bearer.lcid
        );
        bearers.push(bearer);
    }
    Ok(bearers)
}

fn validate(entry: BearerEntry) -> Result<BearerSpec> {
    let split_policy = SplitPolicy::from(entry.split_policy);
    let peer = entry.peer.map(|p| PeerSpec {
        ip_addr: p.ip,
        teid: u32::from_be_bytes(p.teid),
        rnti: p.rnti,
    });
    let dual_connectivity = entry.dual_connectivity.unwrap_or(peer.is_some());
    ensure!(
        !dual_connectivity || !split_policy.uses_remote() || peer.is_some(),
        "Dual connectivity with split policy {split_policy:?} needs a peer"
    );
    if let Some(port) = entry.sdu_port {
        ensure!(port != 0, "SDU port must be non zero");
    }
    Ok(BearerSpec {
        teid: entry.teid.map(u32::from_be_bytes),
        rnti: entry.rnti,
        lcid: entry.lcid,
        du_teid: u32::from_be_bytes(entry.du_teid),
        dual_connectivity,
        in_sequence_delivery: entry.in_sequence_delivery,
        split_policy,
        peer,
        sdu_port: entry.sdu_port,
        deliver_to: entry.deliver_to,
    })
}
