use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::errors::AddressError;

/// One level of an abstraction path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Segment {
    App,
    Hub,
    Pl,
    Beb,
    /// Atomic register instance, keyed by register name.
    Nnar(String),
    /// Uniform consensus instance, keyed by topic.
    Uc(String),
    Ec,
    Eld,
    Epfd,
    /// Epoch consensus instance, keyed by epoch timestamp.
    Ep(u64),
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::App => write!(f, "app"),
            Segment::Hub => write!(f, "hub"),
            Segment::Pl => write!(f, "pl"),
            Segment::Beb => write!(f, "beb"),
            Segment::Nnar(key) => write!(f, "nnar[{}]", key),
            Segment::Uc(topic) => write!(f, "uc[{}]", topic),
            Segment::Ec => write!(f, "ec"),
            Segment::Eld => write!(f, "eld"),
            Segment::Epfd => write!(f, "epfd"),
            Segment::Ep(ts) => write!(f, "ep[{}]", ts),
        }
    }
}

impl FromStr for Segment {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || AddressError::InvalidSegment(s.to_string());

        if let Some((name, rest)) = s.split_once('[') {
            let param = rest.strip_suffix(']').ok_or_else(invalid)?;
            return match name {
                "nnar" => Ok(Segment::Nnar(param.to_string())),
                "uc" => Ok(Segment::Uc(param.to_string())),
                "ep" => param.parse::<u64>().map(Segment::Ep).map_err(|_| invalid()),
                _ => Err(invalid()),
            };
        }

        match s {
            "app" => Ok(Segment::App),
            "hub" => Ok(Segment::Hub),
            "pl" => Ok(Segment::Pl),
            "beb" => Ok(Segment::Beb),
            "ec" => Ok(Segment::Ec),
            "eld" => Ok(Segment::Eld),
            "epfd" => Ok(Segment::Epfd),
            _ => Err(invalid()),
        }
    }
}

/// Subtree an id belongs to, used to decide what to instantiate lazily.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Family {
    App,
    Register(String),
    Consensus(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AbstractionId(Vec<Segment>);

impl AbstractionId {
    pub fn app() -> Self {
        AbstractionId(vec![Segment::App])
    }

    pub fn hub() -> Self {
        AbstractionId(vec![Segment::Hub])
    }

    /// `app.nnar[key]`
    pub fn register(key: &str) -> Self {
        Self::app().child(Segment::Nnar(key.to_string()))
    }

    /// `app.uc[topic]`
    pub fn consensus(topic: &str) -> Self {
        Self::app().child(Segment::Uc(topic.to_string()))
    }

    pub fn child(&self, segment: Segment) -> Self {
        let mut segments = self.0.clone();
        segments.push(segment);
        AbstractionId(segments)
    }

    pub fn pl(&self) -> Self {
        self.child(Segment::Pl)
    }

    pub fn beb(&self) -> Self {
        self.child(Segment::Beb)
    }

    pub fn ec(&self) -> Self {
        self.child(Segment::Ec)
    }

    pub fn eld(&self) -> Self {
        self.child(Segment::Eld)
    }

    pub fn epfd(&self) -> Self {
        self.child(Segment::Epfd)
    }

    pub fn ep(&self, ets: u64) -> Self {
        self.child(Segment::Ep(ets))
    }

    pub fn parent(&self) -> Option<Self> {
        if self.0.len() < 2 {
            return None;
        }
        Some(AbstractionId(self.0[..self.0.len() - 1].to_vec()))
    }

    pub fn segments(&self) -> &[Segment] {
        &self.0
    }

    pub fn last(&self) -> Option<&Segment> {
        self.0.last()
    }

    /// True when `self` equals `ancestor` or lies below it.
    pub fn is_within(&self, ancestor: &AbstractionId) -> bool {
        self.0.starts_with(&ancestor.0)
    }

    pub fn family(&self) -> Option<Family> {
        match self.0.as_slice() {
            [Segment::App, Segment::Nnar(key), ..] => Some(Family::Register(key.clone())),
            [Segment::App, Segment::Uc(topic), ..] => Some(Family::Consensus(topic.clone())),
            [Segment::App, ..] => Some(Family::App),
            _ => None,
        }
    }

    /// Timestamp of the epoch instance this id lies in, if any.
    pub fn epoch(&self) -> Option<u64> {
        self.0.iter().find_map(|s| match s {
            Segment::Ep(ts) => Some(*ts),
            _ => None,
        })
    }

    /// Id of the epoch instance this id lies in (`app.uc[t].ep[ts]`).
    pub fn epoch_root(&self) -> Option<AbstractionId> {
        let pos = self.0.iter().position(|s| matches!(s, Segment::Ep(_)))?;
        Some(AbstractionId(self.0[..=pos].to_vec()))
    }

    pub fn register_key(&self) -> Option<&str> {
        match self.0.as_slice() {
            [Segment::App, Segment::Nnar(key), ..] => Some(key.as_str()),
            _ => None,
        }
    }
}

impl fmt::Display for AbstractionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ".")?;
            }
            write!(f, "{}", segment)?;
        }
        Ok(())
    }
}

impl FromStr for AbstractionId {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(AddressError::Empty);
        }

        // Dots inside brackets belong to a key, not to the path.
        let mut segments = Vec::new();
        let mut depth = 0usize;
        let mut start = 0usize;
        for (i, c) in s.char_indices() {
            match c {
                '[' => depth += 1,
                ']' => depth = depth.saturating_sub(1),
                '.' if depth == 0 => {
                    segments.push(s[start..i].parse::<Segment>()?);
                    start = i + 1;
                }
                _ => {}
            }
        }
        segments.push(s[start..].parse::<Segment>()?);

        Ok(AbstractionId(segments))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_paths() {
        assert_eq!(AbstractionId::register("x").beb().pl().to_string(), "app.nnar[x].beb.pl");
        assert_eq!(AbstractionId::consensus("t").ep(12).to_string(), "app.uc[t].ep[12]");
        assert_eq!(
            AbstractionId::consensus("t").ec().eld().epfd().pl().to_string(),
            "app.uc[t].ec.eld.epfd.pl"
        );
    }

    #[test]
    fn test_parse_matches_construction() {
        let built = AbstractionId::consensus("a.b").ep(3).beb().pl();
        let parsed: AbstractionId = "app.uc[a.b].ep[3].beb.pl".parse().unwrap();
        assert_eq!(built, parsed);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!("app.nope".parse::<AbstractionId>().is_err());
        assert!("app.ep[x]".parse::<AbstractionId>().is_err());
        assert_eq!("".parse::<AbstractionId>(), Err(AddressError::Empty));
    }

    #[test]
    fn test_family() {
        assert_eq!(
            AbstractionId::register("k").pl().family(),
            Some(Family::Register("k".into()))
        );
        assert_eq!(
            AbstractionId::consensus("t").ep(6).beb().family(),
            Some(Family::Consensus("t".into()))
        );
        assert_eq!(AbstractionId::app().beb().family(), Some(Family::App));
        assert_eq!(AbstractionId::hub().family(), None);
    }

    #[test]
    fn test_parent_and_epoch_root() {
        let id = AbstractionId::consensus("t").ep(6).beb().pl();
        assert_eq!(id.parent(), Some(AbstractionId::consensus("t").ep(6).beb()));
        assert_eq!(id.epoch(), Some(6));
        assert_eq!(id.epoch_root(), Some(AbstractionId::consensus("t").ep(6)));
        assert!(id.is_within(&AbstractionId::consensus("t")));
        assert_eq!(AbstractionId::app().parent(), None);
    }
}
