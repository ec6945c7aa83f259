use super::{BodyKey, Contact, ContactSolver, PhysicsError};

use std::collections::HashMap;
use thunderdome as td;

/// Key identifying an unordered pair of distinct bodies.
///
/// The bodies are stored sorted, so `PairKey::new(a, b) == PairKey::new(b, a)`,
/// and this order is the one the pair's contact normals are defined in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PairKey([BodyKey; 2]);

impl PairKey {
    pub fn new(a: BodyKey, b: BodyKey) -> Result<Self, PhysicsError> {
        if a == b {
            return Err(PhysicsError::SelfPair);
        }
        Ok(if a < b { PairKey([a, b]) } else { PairKey([b, a]) })
    }

    /// The two bodies, in the order the contact normals use.
    #[inline]
    pub fn bodies(&self) -> [BodyKey; 2] {
        self.0
    }

    #[inline]
    pub fn contains(&self, body: BodyKey) -> bool {
        self.0[0] == body || self.0[1] == body
    }
}

/// Persistent storage of contact solvers, one per touching pair.
///
/// Solvers live as long as their pair keeps producing contacts,
/// which is what lets accumulated impulses carry over between steps.
#[derive(Clone, Debug, Default)]
pub(super) struct PairCache {
    solvers: td::Arena<(PairKey, ContactSolver)>,
    lookup: HashMap<PairKey, td::Index>,
    /// Solvers that received a manifold this step, in solve order.
    active: Vec<td::Index>,
}

impl PairCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start collecting the pairs of a new step.
    pub fn begin_step(&mut self) {
        self.active.clear();
    }

    /// Hand a fresh manifold to the pair's solver, creating one if the pair is new.
    /// The pair becomes active for this step.
    ///
    /// Returns true if a new solver was created.
    pub fn touch(
        &mut self,
        key: PairKey,
        contacts: Vec<Contact>,
        make_solver: impl FnOnce() -> ContactSolver,
    ) -> bool {
        let (idx, created) = match self.lookup.get(&key) {
            Some(&idx) => {
                if let Some((_, solver)) = self.solvers.get_mut(idx) {
                    solver.update(contacts);
                }
                (idx, false)
            }
            None => {
                let idx = self
                    .solvers
                    .insert((key, make_solver().with_contacts(contacts)));
                self.lookup.insert(key, idx);
                (idx, true)
            }
        };
        self.active.push(idx);
        created
    }

    /// Drop every solver that wasn't touched this step.
    /// Returns the number of pairs removed.
    pub fn end_step(&mut self) -> usize {
        let active = &self.active;
        let before = self.solvers.len();
        self.solvers.retain(|idx, _| active.contains(&idx));
        self.lookup.retain(|_, idx| active.contains(idx));
        before - self.solvers.len()
    }

    /// Run a function on every active solver, in solve order.
    pub fn for_each_active_mut(&mut self, mut f: impl FnMut(PairKey, &mut ContactSolver)) {
        for idx in &self.active {
            if let Some((key, solver)) = self.solvers.get_mut(*idx) {
                f(*key, solver);
            }
        }
    }

    pub fn get(&self, key: PairKey) -> Option<&ContactSolver> {
        let idx = self.lookup.get(&key)?;
        self.solvers.get(*idx).map(|(_, solver)| solver)
    }

    /// Active pairs in solve order.
    pub fn iter_active(&self) -> impl Iterator<Item = (PairKey, &ContactSolver)> {
        self.active
            .iter()
            .filter_map(move |idx| self.solvers.get(*idx))
            .map(|(key, solver)| (*key, solver))
    }

    /// Forget every pair involving the body.
    pub fn remove_body(&mut self, body: BodyKey) {
        self.solvers.retain(|_, (key, _)| !key.contains(body));
        self.lookup.retain(|key, _| !key.contains(body));
        let solvers = &self.solvers;
        self.active.retain(|idx| solvers.contains(*idx));
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.solvers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        math::{self as m, Unit},
        physics::FeatureId,
    };

    fn keys(n: usize) -> Vec<BodyKey> {
        let mut arena = td::Arena::new();
        (0..n).map(|_| BodyKey(arena.insert(()))).collect()
    }

    fn contact(hash: u32) -> Contact {
        Contact::new(m::Vec2::zero(), Unit::unit_x(), 0.1, FeatureId(hash))
    }

    #[test]
    fn pair_key_is_unordered() {
        let k = keys(2);
        assert_eq!(PairKey::new(k[0], k[1]), PairKey::new(k[1], k[0]));
        assert_eq!(PairKey::new(k[1], k[0]).map(|p| p.bodies()), Ok([k[0], k[1]]));
        assert_eq!(PairKey::new(k[0], k[0]), Err(PhysicsError::SelfPair));
    }

    #[test]
    fn solvers_persist_while_touched() {
        let k = keys(3);
        let ab = PairKey::new(k[0], k[1]).unwrap();
        let bc = PairKey::new(k[1], k[2]).unwrap();
        let mut cache = PairCache::new();

        cache.begin_step();
        assert!(cache.touch(ab, vec![contact(1)], || ContactSolver::new(ab.bodies(), 0.0, 1.0)));
        assert!(cache.touch(bc, vec![contact(1)], || ContactSolver::new(bc.bodies(), 0.0, 1.0)));
        assert_eq!(cache.end_step(), 0);
        // pretend the solve left an impulse on the first contact
        cache.for_each_active_mut(|key, solver| {
            let mut c = contact(1);
            c.lambda_normal = 3.0;
            *solver = ContactSolver::new(key.bodies(), 0.0, 1.0).with_contacts(vec![c]);
        });

        cache.begin_step();
        assert!(!cache.touch(ab, vec![contact(1), contact(2)], || {
            unreachable!("pair already has a solver")
        }));
        assert_eq!(cache.end_step(), 1);
        assert!(cache.get(bc).is_none());
        let solver = cache.get(ab).unwrap();
        assert_eq!(solver.contacts()[0].lambda_normal, 3.0);
        assert_eq!(solver.contacts()[1].lambda_normal, 0.0);
        assert_eq!(cache.iter_active().count(), 1);
    }

    #[test]
    fn removing_a_body_drops_its_pairs() {
        let k = keys(3);
        let mut cache = PairCache::new();
        cache.begin_step();
        for (a, b) in [(0, 1), (1, 2), (0, 2)] {
            let key = PairKey::new(k[a], k[b]).unwrap();
            cache.touch(key, vec![contact(0)], || ContactSolver::new(key.bodies(), 0.0, 0.0));
        }
        cache.remove_body(k[1]);
        assert_eq!(cache.len(), 1);
        assert_eq!(
            cache.iter_active().map(|(key, _)| key).collect::<Vec<_>>(),
            vec![PairKey::new(k[0], k[2]).unwrap()]
        );
    }
}
