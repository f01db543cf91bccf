//! IPv4 CIDR blocks and sequential subnet allocation.

use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

/// An IPv4 network in CIDR notation. The address is always the network
/// address (host bits cleared).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ipv4Cidr {
    network: u32,
    prefix: u8,
}

impl Ipv4Cidr {
    /// Build a block, rejecting prefixes above 32 and addresses with host bits set.
    pub fn new(addr: Ipv4Addr, prefix: u8) -> Result<Self, String> {
        if prefix > 32 {
            return Err(format!("prefix /{} out of range", prefix));
        }
        let network = u32::from(addr);
        if network & !mask(prefix) != 0 {
            return Err(format!("{}/{} has host bits set", addr, prefix));
        }
        Ok(Self { network, prefix })
    }

    pub fn prefix(&self) -> u8 {
        self.prefix
    }

    pub fn network(&self) -> Ipv4Addr {
        Ipv4Addr::from(self.network)
    }

    /// Number of addresses in the block.
    pub fn size(&self) -> u64 {
        1u64 << (32 - u32::from(self.prefix))
    }

    /// Last address (inclusive) as an integer.
    fn last(&self) -> u64 {
        u64::from(self.network) + self.size() - 1
    }

    pub fn contains(&self, other: &Ipv4Cidr) -> bool {
        other.prefix >= self.prefix
            && u64::from(other.network) >= u64::from(self.network)
            && other.last() <= self.last()
    }

    pub fn overlaps(&self, other: &Ipv4Cidr) -> bool {
        u64::from(self.network) <= other.last() && u64::from(other.network) <= self.last()
    }

    /// True for `0.0.0.0/0`.
    pub fn is_any(&self) -> bool {
        self.prefix == 0
    }
}

fn mask(prefix: u8) -> u32 {
    if prefix == 0 {
        0
    } else {
        u32::MAX << (32 - u32::from(prefix))
    }
}

impl FromStr for Ipv4Cidr {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (addr, prefix) = s
            .split_once('/')
            .ok_or_else(|| format!("'{}' is not in CIDR notation", s))?;
        let addr: Ipv4Addr = addr
            .parse()
            .map_err(|_| format!("'{}' has an invalid IPv4 address", s))?;
        let prefix: u8 = prefix
            .parse()
            .map_err(|_| format!("'{}' has an invalid prefix length", s))?;
        Self::new(addr, prefix)
    }
}

impl fmt::Display for Ipv4Cidr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.network(), self.prefix)
    }
}

/// Hands out non-overlapping child blocks of a parent network, in order.
///
/// Each request is aligned to its own block size, so mixing masks leaves
/// gaps rather than producing misaligned networks.
#[derive(Debug, Clone)]
pub struct SubnetAllocator {
    parent: Ipv4Cidr,
    cursor: u64,
}

impl SubnetAllocator {
    pub fn new(parent: Ipv4Cidr) -> Self {
        Self {
            parent,
            cursor: u64::from(parent.network),
        }
    }

    /// Allocate the next `/mask` block.
    pub fn allocate(&mut self, mask: u8) -> Result<Ipv4Cidr, String> {
        if mask < self.parent.prefix || mask > 32 {
            return Err(format!(
                "cannot carve a /{} out of {}",
                mask, self.parent
            ));
        }
        let size = 1u64 << (32 - u32::from(mask));
        let start = self.cursor.div_ceil(size) * size;
        let end = start + size - 1;
        if end > self.parent.last() {
            return Err(format!(
                "{} has no room left for another /{}",
                self.parent, mask
            ));
        }
        self.cursor = end + 1;
        let network = u32::try_from(start).map_err(|e| e.to_string())?;
        Ok(Ipv4Cidr {
            network,
            prefix: mask,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_cidr_parse_display() {
        let c: Ipv4Cidr = "10.0.0.0/16".parse().unwrap();
        assert_eq!(c.prefix(), 16);
        assert_eq!(c.to_string(), "10.0.0.0/16");
        assert_eq!(c.size(), 65536);
    }

    #[test]
    fn test_cidr_rejects_host_bits() {
        assert!("10.0.0.1/16".parse::<Ipv4Cidr>().is_err());
        assert!("10.0.0.0/33".parse::<Ipv4Cidr>().is_err());
        assert!("10.0.0.0".parse::<Ipv4Cidr>().is_err());
        assert!("10.0.0/8".parse::<Ipv4Cidr>().is_err());
    }

    #[test]
    fn test_cidr_any() {
        let any: Ipv4Cidr = "0.0.0.0/0".parse().unwrap();
        assert!(any.is_any());
        assert!(any.contains(&"10.1.2.0/24".parse().unwrap()));
    }

    #[test]
    fn test_allocator_sequential_24s() {
        let mut alloc = SubnetAllocator::new("10.0.0.0/16".parse().unwrap());
        let got: Vec<String> = (0..4).map(|_| alloc.allocate(24).unwrap().to_string()).collect();
        assert_eq!(got, vec!["10.0.0.0/24", "10.0.1.0/24", "10.0.2.0/24", "10.0.3.0/24"]);
    }

    #[test]
    fn test_allocator_aligns_mixed_masks() {
        let mut alloc = SubnetAllocator::new("10.0.0.0/16".parse().unwrap());
        assert_eq!(alloc.allocate(26).unwrap().to_string(), "10.0.0.0/26");
        // next /24 must start on a /24 boundary
        assert_eq!(alloc.allocate(24).unwrap().to_string(), "10.0.1.0/24");
    }

    #[test]
    fn test_allocator_exhaustion() {
        let mut alloc = SubnetAllocator::new("10.0.0.0/23".parse().unwrap());
        alloc.allocate(24).unwrap();
        alloc.allocate(24).unwrap();
        let err = alloc.allocate(24).unwrap_err();
        assert!(err.contains("no room"));
    }

    #[test]
    fn test_allocator_rejects_larger_than_parent() {
        let mut alloc = SubnetAllocator::new("10.0.0.0/24".parse().unwrap());
        assert!(alloc.allocate(16).is_err());
    }

    proptest! {
        #[test]
        fn prop_allocations_disjoint_and_contained(masks in proptest::collection::vec(18u8..=28, 1..12)) {
            let parent: Ipv4Cidr = "10.0.0.0/16".parse().unwrap();
            let mut alloc = SubnetAllocator::new(parent);
            let mut taken: Vec<Ipv4Cidr> = Vec::new();
            for m in masks {
                if let Ok(block) = alloc.allocate(m) {
                    prop_assert!(parent.contains(&block));
                    prop_assert_eq!(block.prefix(), m);
                    for prev in &taken {
                        prop_assert!(!prev.overlaps(&block));
                    }
                    taken.push(block);
                }
            }
        }
    }
}
