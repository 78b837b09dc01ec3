use std::collections::HashMap;

use super::error::PatchError;
use crate::defs::PatchRuleDef;
use crate::dmx::UNIVERSE_SIZE;

/// Immutable channel rewiring rules, grouped by universe at load time.
///
/// The emitter applies these to a transient send-copy of a frame; the
/// authoritative universe buffers never contain patched bytes. Whether the
/// emitter applies them at all is a runtime toggle; `enabled` here is only
/// the initial position of that toggle.
#[derive(Debug, Default)]
pub struct PatchSnapshot {
    /// Per universe, (src, dst) pairs in declaration order.
    by_universe: HashMap<u16, Vec<(u16, u16)>>,
    rule_count: usize,
    pub enabled: bool,
}

impl PatchSnapshot {
    /// Checks channel bounds and rejects rule sets whose src→dst graph has a
    /// cycle in any universe. Acyclic rules applied in declaration order
    /// give one well-defined result.
    pub fn validate(rules: &[PatchRuleDef], enabled: bool) -> Result<PatchSnapshot, PatchError> {
        let mut by_universe: HashMap<u16, Vec<(u16, u16)>> = HashMap::new();

        for rule in rules {
            let in_range = |channel: u16| channel >= 1 && channel <= UNIVERSE_SIZE as u16;
            if !in_range(rule.src_channel) || !in_range(rule.dst_channel) {
                return Err(PatchError::ChannelOutOfRange(
                    rule.src_channel,
                    rule.dst_channel,
                    rule.universe,
                ));
            }

            by_universe
                .entry(rule.universe)
                .or_default()
                .push((rule.src_channel, rule.dst_channel));
        }

        for (universe, rules) in by_universe.iter() {
            Self::check_acyclic(*universe, rules)?;
        }

        Ok(PatchSnapshot {
            by_universe,
            rule_count: rules.len(),
            enabled,
        })
    }

    fn check_acyclic(universe: u16, rules: &[(u16, u16)]) -> Result<(), PatchError> {
        let mut edges: HashMap<u16, Vec<u16>> = HashMap::new();
        for (src, dst) in rules {
            if src == dst {
                return Err(PatchError::Cycle(universe, *src));
            }
            edges.entry(*src).or_default().push(*dst);
        }

        // Iterative DFS, colored: 0 unvisited, 1 on stack, 2 done.
        let mut color: HashMap<u16, u8> = HashMap::new();
        for &start in edges.keys() {
            if color.get(&start).copied().unwrap_or(0) != 0 {
                continue;
            }

            let mut stack = vec![(start, 0usize)];
            color.insert(start, 1);

            while let Some(&(node, next)) = stack.last() {
                let targets = edges.get(&node).map(Vec::as_slice).unwrap_or(&[]);
                if next < targets.len() {
                    stack.last_mut().unwrap().1 += 1;
                    let target = targets[next];
                    match color.get(&target).copied().unwrap_or(0) {
                        0 => {
                            color.insert(target, 1);
                            stack.push((target, 0));
                        }
                        1 => return Err(PatchError::Cycle(universe, target)),
                        _ => {}
                    }
                } else {
                    color.insert(node, 2);
                    stack.pop();
                }
            }
        }

        Ok(())
    }

    /// Rewrites `frame` in place, in declaration order.
    pub fn apply(&self, universe: u16, frame: &mut [u8; UNIVERSE_SIZE]) {
        if let Some(rules) = self.by_universe.get(&universe) {
            for (src, dst) in rules {
                frame[(*dst - 1) as usize] = frame[(*src - 1) as usize];
            }
        }
    }

    pub fn rule_count(&self) -> usize {
        self.rule_count
    }
}
