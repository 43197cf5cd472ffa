//! split - choose the leg of a split bearer for each transmitted PDU

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Path {
    Local,
    Remote,
}

/// How PDUs are divided between the legs when dual connectivity is in use.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum SplitPolicy {
    /// Strictly alternate, starting with the local leg.
    #[default]
    Alternate,
    LocalOnly,
    RemoteOnly,
}

impl SplitPolicy {
    pub fn uses_remote(&self) -> bool {
        *self != SplitPolicy::LocalOnly
    }
}

#[derive(Debug)]
pub struct TransmitSelector {
    policy: SplitPolicy,
    dual_connectivity: bool,
    send_over_secondary: bool,
}

impl TransmitSelector {
    pub fn new(policy: SplitPolicy, dual_connectivity: bool) -> Self {
        TransmitSelector {
            policy,
            dual_connectivity,
            send_over_secondary: false,
        }
    }

    pub fn select(&mut self) -> Path {
        if !self.dual_connectivity {
            return Path::Local;
        }
        match self.policy {
            SplitPolicy::LocalOnly => Path::Local,
            SplitPolicy::RemoteOnly => Path::Remote,
            SplitPolicy::Alternate => {
                let path = if self.send_over_secondary {
                    Path::Remote
                } else {
                    Path::Local
                };
                self.send_over_secondary = !self.send_over_secondary;
                path
            }
        }
    }
}
