//! Named-vector spaces.
//!
//! A [`Space`] packs named sub-vectors into one flat buffer. Every scalar has
//! a raw value, a normalizer and a normalized value kept in step:
//! `normalized[i] = raw[i] / (normalizer[i] + EPS)`.
//!
//! Registration is append-only: offsets never move and lengths never change.
//! The layout is shared between a space and everything derived from it by
//! arithmetic, so scratch spaces built during integration are cheap to clone.

use crate::{CoreError, CoreResult, EPS, NORM_LIMIT, Real};
use nalgebra::{DVector, SVector};
use std::collections::HashMap;
use std::sync::Arc;

/// Location of a named sub-vector inside the flat buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Slot {
    pub offset: usize,
    pub len: usize,
}

impl Slot {
    pub fn range(&self) -> std::ops::Range<usize> {
        self.offset..self.offset + self.len
    }
}

#[derive(Clone, Debug, Default)]
struct Layout {
    slots: HashMap<String, Slot>,
    order: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct Space {
    name: String,
    layout: Arc<Layout>,
    values: DVector<Real>,
    normalized: DVector<Real>,
    normalizer: DVector<Real>,
    defaults: DVector<Real>,
    limit: Real,
    guarded: bool,
    tripped: bool,
}

impl Space {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            layout: Arc::new(Layout::default()),
            values: DVector::zeros(0),
            normalized: DVector::zeros(0),
            normalizer: DVector::zeros(0),
            defaults: DVector::zeros(0),
            limit: NORM_LIMIT,
            guarded: false,
            tripped: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.layout.slots.contains_key(name)
    }

    /// Registered names in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.layout.order.iter().map(String::as_str)
    }

    /// Register a sub-vector with initial values and a uniform normalizer.
    ///
    /// Registering an existing name again with the same length overwrites its
    /// initial values and normalizer; a different length is an error.
    pub fn register(&mut self, name: &str, initial: &[Real], normalizer: Real) -> CoreResult<Slot> {
        if let Some(slot) = self.layout.slots.get(name).copied() {
            if slot.len != initial.len() {
                return Err(CoreError::SizeMismatch {
                    what: format!("re-registration of '{name}' in '{}'", self.name),
                    expected: slot.len,
                    actual: initial.len(),
                });
            }
            for (k, i) in slot.range().enumerate() {
                self.values[i] = initial[k];
                self.defaults[i] = initial[k];
                self.normalizer[i] = normalizer;
                self.normalized[i] = initial[k] / (normalizer + EPS);
            }
            return Ok(slot);
        }

        let slot = Slot {
            offset: self.values.len(),
            len: initial.len(),
        };
        let layout = Arc::make_mut(&mut self.layout);
        layout.slots.insert(name.to_string(), slot);
        layout.order.push(name.to_string());

        let n = slot.offset + slot.len;
        self.values = self.values.clone().resize_vertically(n, 0.0);
        self.normalizer = self.normalizer.clone().resize_vertically(n, normalizer);
        for (k, i) in slot.range().enumerate() {
            self.values[i] = initial[k];
        }
        self.defaults = self.values.clone();
        self.normalized = self.normalize(&self.values);
        Ok(slot)
    }

    pub fn slot(&self, name: &str) -> CoreResult<Slot> {
        self.layout
            .slots
            .get(name)
            .copied()
            .ok_or_else(|| CoreError::NotFound {
                name: name.to_string(),
                space: self.name.clone(),
            })
    }

    /// Override the normalizer of one sub-vector.
    pub fn set_normalizer(&mut self, name: &str, normalizer: &[Real]) -> CoreResult<()> {
        let slot = self.checked_slot(name, normalizer.len())?;
        for (k, i) in slot.range().enumerate() {
            self.normalizer[i] = normalizer[k];
            self.normalized[i] = self.values[i] / (normalizer[k] + EPS);
        }
        Ok(())
    }

    /// Divergence threshold applied to normalized magnitudes.
    pub fn set_limit(&mut self, limit: Real) {
        self.limit = limit;
    }

    pub fn limit(&self) -> Real {
        self.limit
    }

    pub fn get(&self, name: &str) -> CoreResult<&[Real]> {
        let slot = self.slot(name)?;
        Ok(&self.values.as_slice()[slot.range()])
    }

    pub fn get_normalized(&self, name: &str) -> CoreResult<&[Real]> {
        let slot = self.slot(name)?;
        Ok(&self.normalized.as_slice()[slot.range()])
    }

    pub fn get_value(&self, name: &str, index: usize) -> CoreResult<Real> {
        let slot = self.slot(name)?;
        if index >= slot.len {
            return Err(CoreError::SizeMismatch {
                what: format!("index into '{name}'"),
                expected: slot.len,
                actual: index,
            });
        }
        Ok(self.values[slot.offset + index])
    }

    /// Fixed-size copy of a sub-vector.
    pub fn vector<const N: usize>(&self, name: &str) -> CoreResult<SVector<Real, N>> {
        let slot = self.checked_slot(name, N)?;
        Ok(SVector::<Real, N>::from_column_slice(
            &self.values.as_slice()[slot.range()],
        ))
    }

    /// Overwrite a sub-vector. On length mismatch the buffer is left untouched.
    pub fn set(&mut self, name: &str, values: &[Real]) -> CoreResult<()> {
        let slot = self.checked_slot(name, values.len())?;
        for (k, i) in slot.range().enumerate() {
            self.values[i] = values[k];
            self.normalized[i] = values[k] / (self.normalizer[i] + EPS);
        }
        self.check_guard();
        Ok(())
    }

    pub fn set_normalized(&mut self, name: &str, normalized: &[Real]) -> CoreResult<()> {
        let slot = self.checked_slot(name, normalized.len())?;
        for (k, i) in slot.range().enumerate() {
            self.normalized[i] = normalized[k];
            self.values[i] = normalized[k] * (self.normalizer[i] + EPS);
        }
        self.check_guard();
        Ok(())
    }

    pub fn set_value(&mut self, index: usize, value: Real) -> CoreResult<()> {
        self.check_index(index)?;
        self.values[index] = value;
        self.normalized[index] = value / (self.normalizer[index] + EPS);
        self.check_guard();
        Ok(())
    }

    pub fn set_normalized_value(&mut self, index: usize, value: Real) -> CoreResult<()> {
        self.check_index(index)?;
        self.normalized[index] = value;
        self.values[index] = value * (self.normalizer[index] + EPS);
        self.check_guard();
        Ok(())
    }

    /// Replace the whole raw buffer.
    pub fn assign_values(&mut self, values: &[Real]) -> CoreResult<()> {
        self.check_len(values.len(), "assignment")?;
        self.values.copy_from_slice(values);
        self.normalized = self.normalize(&self.values);
        self.check_guard();
        Ok(())
    }

    /// Replace the whole buffer from normalized values.
    pub fn assign_normalized(&mut self, normalized: &[Real]) -> CoreResult<()> {
        self.check_len(normalized.len(), "normalized assignment")?;
        self.normalized.copy_from_slice(normalized);
        self.values = self
            .normalized
            .zip_map(&self.normalizer, |n, k| n * (k + EPS));
        self.check_guard();
        Ok(())
    }

    /// Take over another space's raw values, keeping this space's normalizer.
    pub fn assign(&mut self, other: &Space) -> CoreResult<()> {
        self.assign_values(other.values.as_slice())
    }

    pub fn fill_zero(&mut self) {
        self.values.fill(0.0);
        self.normalized.fill(0.0);
    }

    /// Restore registration-time values.
    pub fn to_default(&mut self) {
        self.values = self.defaults.clone();
        self.normalized = self.normalize(&self.values);
    }

    pub fn values(&self) -> &DVector<Real> {
        &self.values
    }

    pub fn normalized(&self) -> &DVector<Real> {
        &self.normalized
    }

    pub fn normalizer(&self) -> &DVector<Real> {
        &self.normalizer
    }

    pub fn is_diverged(&self) -> bool {
        self.normalized.iter().any(|v| !(v.abs() <= self.limit))
    }

    /// Arm or disarm the divergence latch checked on every mutation.
    pub fn set_guarded(&mut self, guarded: bool) {
        self.guarded = guarded;
    }

    pub fn is_guarded(&self) -> bool {
        self.guarded
    }

    /// Returns whether a guarded mutation diverged since the last call.
    pub fn take_tripped(&mut self) -> bool {
        std::mem::take(&mut self.tripped)
    }

    pub fn try_add(&self, other: &Space) -> CoreResult<Space> {
        self.zip_with(other, "summation", |a, b| a + b)
    }

    pub fn try_sub(&self, other: &Space) -> CoreResult<Space> {
        self.zip_with(other, "subtraction", |a, b| a - b)
    }

    pub fn try_mul(&self, other: &Space) -> CoreResult<Space> {
        self.zip_with(other, "multiplication", |a, b| a * b)
    }

    /// Element-wise division, guarded by `EPS` in the denominator.
    pub fn try_div(&self, other: &Space) -> CoreResult<Space> {
        self.zip_with(other, "division", |a, b| a / (b + EPS))
    }

    pub fn scaled(&self, k: Real) -> Space {
        self.derived(self.values.map(|v| v * k))
    }

    pub fn offset(&self, k: Real) -> Space {
        self.derived(self.values.map(|v| v + k))
    }

    /// Scalar division, guarded by `EPS` like `try_div`.
    pub fn divided(&self, k: Real) -> Space {
        self.derived(self.values.map(|v| v / (k + EPS)))
    }

    fn zip_with(
        &self,
        other: &Space,
        what: &str,
        f: impl Fn(Real, Real) -> Real,
    ) -> CoreResult<Space> {
        self.check_len(other.len(), what)?;
        Ok(self.derived(self.values.zip_map(&other.values, f)))
    }

    fn derived(&self, values: DVector<Real>) -> Space {
        Space {
            name: self.name.clone(),
            layout: Arc::clone(&self.layout),
            normalized: self.normalize(&values),
            values,
            normalizer: self.normalizer.clone(),
            defaults: self.defaults.clone(),
            limit: self.limit,
            guarded: false,
            tripped: false,
        }
    }

    fn normalize(&self, values: &DVector<Real>) -> DVector<Real> {
        values.zip_map(&self.normalizer, |v, k| v / (k + EPS))
    }

    fn check_guard(&mut self) {
        if self.guarded && self.is_diverged() {
            self.tripped = true;
        }
    }

    fn checked_slot(&self, name: &str, len: usize) -> CoreResult<Slot> {
        let slot = self.slot(name)?;
        if slot.len != len {
            return Err(CoreError::SizeMismatch {
                what: format!("'{name}' in '{}'", self.name),
                expected: slot.len,
                actual: len,
            });
        }
        Ok(slot)
    }

    fn check_len(&self, len: usize, what: &str) -> CoreResult<()> {
        if len != self.len() {
            return Err(CoreError::SizeMismatch {
                what: format!("{what} on '{}'", self.name),
                expected: self.len(),
                actual: len,
            });
        }
        Ok(())
    }

    fn check_index(&self, index: usize) -> CoreResult<()> {
        if index >= self.len() {
            return Err(CoreError::SizeMismatch {
                what: format!("flat index into '{}'", self.name),
                expected: self.len(),
                actual: index,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Space {
        let mut s = Space::new("State");
        s.register("uvw", &[1.0, 2.0, 3.0], 10.0).unwrap();
        s.register("psi", &[0.5], 1.0).unwrap();
        s
    }

    #[test]
    fn register_appends_contiguously() {
        let s = sample();
        assert_eq!(s.slot("uvw").unwrap(), Slot { offset: 0, len: 3 });
        assert_eq!(s.slot("psi").unwrap(), Slot { offset: 3, len: 1 });
        assert_eq!(s.len(), 4);
        assert_eq!(s.normalizer().len(), 4);
        assert_eq!(s.normalized().len(), 4);
        assert_eq!(s.names().collect::<Vec<_>>(), vec!["uvw", "psi"]);
    }

    #[test]
    fn reregister_with_other_length_fails() {
        let mut s = sample();
        assert!(matches!(
            s.register("uvw", &[0.0, 0.0], 1.0),
            Err(CoreError::SizeMismatch { .. })
        ));
        assert!(s.register("psi", &[0.7], 2.0).is_ok());
        assert_eq!(s.get("psi").unwrap(), &[0.7]);
        assert_eq!(s.len(), 4);
    }

    #[test]
    fn unknown_name_is_not_found() {
        let s = sample();
        let err = s.get("pqr").unwrap_err();
        assert!(matches!(err, CoreError::NotFound { .. }));
        assert!(format!("{err}").contains("pqr"));
    }

    #[test]
    fn mismatched_set_leaves_buffer() {
        let mut s = sample();
        let before = s.values().clone();
        assert!(s.set("uvw", &[9.0, 9.0]).is_err());
        assert_eq!(s.values(), &before);
    }

    #[test]
    fn to_default_restores_registration_values() {
        let mut s = sample();
        s.set("uvw", &[7.0, 8.0, 9.0]).unwrap();
        s.fill_zero();
        assert_eq!(s.get("psi").unwrap(), &[0.0]);
        s.to_default();
        assert_eq!(s.get("uvw").unwrap(), &[1.0, 2.0, 3.0]);
        assert!((s.get_normalized("uvw").unwrap()[0] - 0.1).abs() < 1e-6);
    }

    #[test]
    fn arithmetic_shares_layout() {
        let a = sample();
        let b = a.scaled(2.0);
        let c = a.try_add(&b).unwrap();
        assert_eq!(c.get("uvw").unwrap(), &[3.0, 6.0, 9.0]);
        assert_eq!(c.slot("psi").unwrap(), a.slot("psi").unwrap());
        let d = c.try_sub(&a).unwrap().offset(1.0);
        assert_eq!(d.get("psi").unwrap(), &[2.0]);
        let e = a.try_mul(&a).unwrap();
        assert_eq!(e.get("uvw").unwrap(), &[1.0, 4.0, 9.0]);
        let f = a.try_div(&a).unwrap();
        assert!((f.get("uvw").unwrap()[2] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn scalar_division_recomputes_normalized() {
        let a = sample();
        let half = a.divided(2.0);
        assert!((half.get("uvw").unwrap()[1] - 1.0).abs() < 1e-6);
        assert!((half.get_normalized("uvw").unwrap()[0] - 0.05).abs() < 1e-6);
        assert_eq!(half.slot("uvw").unwrap(), a.slot("uvw").unwrap());
        // zero divisor hits the EPS guard instead of producing inf
        let guarded = a.divided(0.0);
        assert!(guarded.get("uvw").unwrap().iter().all(|v| v.is_finite()));
        assert!(guarded.is_diverged());
    }

    #[test]
    fn arithmetic_rejects_unequal_lengths() {
        let a = sample();
        let mut other = Space::new("Action");
        other.register("swash", &[0.0; 4], 1.0).unwrap();
        other.register("x", &[0.0], 1.0).unwrap();
        assert!(a.try_add(&other).is_err());
        let mut short = Space::new("Short");
        short.register("x", &[0.0], 1.0).unwrap();
        assert!(a.try_sub(&short).is_err());
        let mut target = sample();
        assert!(target.assign(&short).is_err());
    }

    #[test]
    fn guard_latches_divergence() {
        let mut s = Space::new("State");
        s.register("x", &[0.0, 0.0], 1.0).unwrap();
        s.set_guarded(true);
        s.set("x", &[19.0, -19.0]).unwrap();
        assert!(!s.take_tripped());
        s.set_value(1, 25.0).unwrap();
        assert!(s.is_diverged());
        assert!(s.take_tripped());
        assert!(!s.take_tripped());

        s.set_guarded(false);
        s.set_value(0, 30.0).unwrap();
        assert!(!s.take_tripped());
    }

    #[test]
    fn nan_counts_as_diverged() {
        let mut s = Space::new("State");
        s.register("x", &[0.0], 1.0).unwrap();
        s.set("x", &[Real::NAN]).unwrap();
        assert!(s.is_diverged());
    }

    #[test]
    fn custom_normalizer_scales_divergence() {
        let mut s = Space::new("State");
        s.register("w", &[0.0, 0.0], 1.0).unwrap();
        s.set_normalizer("w", &[1.0, 10.0]).unwrap();
        s.set("w", &[0.0, 150.0]).unwrap();
        assert!(!s.is_diverged());
        s.set_limit(10.0);
        assert!(s.is_diverged());
    }

    #[test]
    fn fixed_size_read() {
        let s = sample();
        let v = s.vector::<3>("uvw").unwrap();
        assert_eq!(v[2], 3.0);
        assert!(s.vector::<2>("uvw").is_err());
    }
}
