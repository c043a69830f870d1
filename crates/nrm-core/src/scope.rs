use uuid::Uuid;

use crate::bitmap::Bitmap;
use crate::rcstring::RcString;
use nrm_proto::ScopeSpec;

/// A named resource scope: a union of CPU, NUMA-node and GPU index sets.
///
/// Two scopes compare equal when their index sets match, regardless of
/// name or uuid: the event base keys series by this structural identity, not
/// by registration, so that a sensor can tag readings against an ad hoc
/// scope that was never separately registered.
#[derive(Debug, Clone)]
pub struct Scope {
    pub uuid: Option<Uuid>,
    pub name: RcString,
    pub cpu: Bitmap,
    pub numa: Bitmap,
    pub gpu: Bitmap,
}

impl Scope {
    pub fn new(name: impl Into<RcString>, cpu: Bitmap, numa: Bitmap, gpu: Bitmap) -> Self {
        Scope {
            uuid: None,
            name: name.into(),
            cpu,
            numa,
            gpu,
        }
    }

    pub fn registered(mut self, uuid: Uuid) -> Self {
        self.uuid = Some(uuid);
        self
    }

    pub fn from_spec(spec: &ScopeSpec) -> Self {
        Scope::new(
            spec.name.as_str(),
            Bitmap::from_indices(spec.cpu.iter().copied()),
            Bitmap::from_indices(spec.numa.iter().copied()),
            Bitmap::from_indices(spec.gpu.iter().copied()),
        )
    }

    pub fn to_spec(&self) -> ScopeSpec {
        ScopeSpec {
            name: self.name.to_string(),
            cpu: self.cpu.to_indices(),
            numa: self.numa.to_indices(),
            gpu: self.gpu.to_indices(),
        }
    }
}

/// Structural equality only: this is the comparison the event base performs
/// to decide whether an incoming event matches an already-tracked series.
impl PartialEq for Scope {
    fn eq(&self, other: &Self) -> bool {
        self.cpu == other.cpu && self.numa == other.numa && self.gpu == other.gpu
    }
}
impl Eq for Scope {}
