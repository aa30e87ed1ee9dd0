//! Network configuration

use crate::error::{Result, VmComposeError};
use std::net::Ipv4Addr;

/// Host number reserved for the gateway on every subnet
pub const GATEWAY_HOST: u8 = 254;

/// Highest host number an instance may receive (`.254` is the gateway)
pub const MAX_HOST: u8 = GATEWAY_HOST - 1;

/// A /24 network that instances attach to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubnetConfig {
    /// Network name in the manifest
    pub name: String,
    /// Network prefix; the host octet is ignored
    pub prefix: Ipv4Addr,
    /// Network driver
    pub driver: String,
}

impl SubnetConfig {
    /// Create a bridge network over `prefix`/24
    pub fn new(name: &str, prefix: Ipv4Addr) -> Self {
        let [a, b, c, _] = prefix.octets();
        Self {
            name: name.to_string(),
            prefix: Ipv4Addr::new(a, b, c, 0),
            driver: "bridge".to_string(),
        }
    }

    /// Parse a subnet in CIDR format; only /24 networks are accepted
    pub fn parse(name: &str, cidr: &str) -> Result<Self> {
        let (addr, bits) = cidr
            .split_once('/')
            .ok_or_else(|| VmComposeError::InvalidConfig(format!("Invalid subnet: {}", cidr)))?;

        if bits != "24" {
            return Err(VmComposeError::InvalidConfig(format!(
                "Subnet {} must be a /24 network",
                cidr
            )));
        }

        let base: Ipv4Addr = addr
            .parse()
            .map_err(|_| VmComposeError::InvalidConfig(format!("Invalid IP: {}", addr)))?;

        Ok(Self::new(name, base))
    }

    /// Address of host number `host` on this subnet
    pub fn host(&self, host: u8) -> Ipv4Addr {
        let [a, b, c, _] = self.prefix.octets();
        Ipv4Addr::new(a, b, c, host)
    }

    /// Gateway address
    pub fn gateway(&self) -> Ipv4Addr {
        self.host(GATEWAY_HOST)
    }

    /// Subnet in CIDR format
    pub fn cidr(&self) -> String {
        format!("{}/24", self.prefix)
    }
}

/// The primary and secondary networks every instance is attached to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkLayout {
    pub primary: SubnetConfig,
    pub secondary: SubnetConfig,
}

impl Default for NetworkLayout {
    fn default() -> Self {
        Self {
            primary: SubnetConfig::new("vm_net_primary", Ipv4Addr::new(172, 20, 30, 0)),
            secondary: SubnetConfig::new("vm_net_secondary", Ipv4Addr::new(172, 20, 40, 0)),
        }
    }
}

impl NetworkLayout {
    /// Both networks, primary first
    pub fn subnets(&self) -> [&SubnetConfig; 2] {
        [&self.primary, &self.secondary]
    }

    /// Check the layout can address instances unambiguously
    pub fn validate(&self) -> Result<()> {
        if self.primary.name == self.secondary.name {
            return Err(VmComposeError::InvalidConfig(format!(
                "Primary and secondary networks share the name '{}'",
                self.primary.name
            )));
        }
        if self.primary.prefix == self.secondary.prefix {
            return Err(VmComposeError::InvalidConfig(format!(
                "Primary and secondary networks share the subnet {}",
                self.primary.cidr()
            )));
        }
        Ok(())
    }
}
