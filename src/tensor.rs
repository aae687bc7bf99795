//! Shared parameter tensor
//!
//! A flat f32 buffer with an optional gradient and a requires-grad flag.
//! Clones share storage, so a model and its optimizer can hold the same
//! parameter; `detached` produces an independent copy for snapshots.

use ndarray::Array1;
use std::cell::{Ref, RefCell, RefMut};
use std::rc::Rc;

struct TensorInner {
    data: Array1<f32>,
    grad: Option<Array1<f32>>,
    requires_grad: bool,
}

/// A 1D parameter tensor with interior mutability
#[derive(Clone)]
pub struct Tensor(Rc<RefCell<TensorInner>>);

impl Tensor {
    /// Create a tensor from a vector
    pub fn from_vec(data: Vec<f32>, requires_grad: bool) -> Self {
        Self(Rc::new(RefCell::new(TensorInner {
            data: Array1::from(data),
            grad: None,
            requires_grad,
        })))
    }

    /// Create a zero-initialized tensor of length `n`
    pub fn zeros(n: usize, requires_grad: bool) -> Self {
        Self::from_vec(vec![0.0; n], requires_grad)
    }

    /// Borrow the underlying data
    pub fn data(&self) -> Ref<'_, Array1<f32>> {
        Ref::map(self.0.borrow(), |inner| &inner.data)
    }

    /// Mutably borrow the underlying data
    pub fn data_mut(&self) -> RefMut<'_, Array1<f32>> {
        RefMut::map(self.0.borrow_mut(), |inner| &mut inner.data)
    }

    /// Current gradient, if one has been set
    pub fn grad(&self) -> Option<Array1<f32>> {
        self.0.borrow().grad.clone()
    }

    /// Replace the gradient
    pub fn set_grad(&self, grad: Array1<f32>) {
        self.0.borrow_mut().grad = Some(grad);
    }

    /// Add into the gradient, initializing it if absent
    pub fn accumulate_grad(&self, grad: &Array1<f32>) {
        let mut inner = self.0.borrow_mut();
        match &mut inner.grad {
            Some(g) => *g += grad,
            None => inner.grad = Some(grad.clone()),
        }
    }

    /// Clear the gradient
    pub fn zero_grad(&self) {
        self.0.borrow_mut().grad = None;
    }

    /// Number of elements
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.borrow().data.len()
    }

    /// Whether the tensor holds no elements
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether this parameter participates in optimization
    #[must_use]
    pub fn requires_grad(&self) -> bool {
        self.0.borrow().requires_grad
    }

    /// Enable or disable optimization of this parameter
    pub fn set_requires_grad(&self, requires_grad: bool) {
        self.0.borrow_mut().requires_grad = requires_grad;
    }

    /// Copy out the data
    #[must_use]
    pub fn to_vec(&self) -> Vec<f32> {
        self.0.borrow().data.to_vec()
    }

    /// Independent deep copy (no shared storage, no gradient)
    #[must_use]
    pub fn detached(&self) -> Tensor {
        let inner = self.0.borrow();
        Tensor::from_vec(inner.data.to_vec(), inner.requires_grad)
    }

    /// Whether two handles point at the same storage
    #[must_use]
    pub fn same_storage(&self, other: &Tensor) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl std::fmt::Debug for Tensor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.0.borrow();
        f.debug_struct("Tensor")
            .field("len", &inner.data.len())
            .field("requires_grad", &inner.requires_grad)
            .field("has_grad", &inner.grad.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::arr1;

    #[test]
    fn test_clone_shares_storage() {
        let a = Tensor::from_vec(vec![1.0, 2.0], true);
        let b = a.clone();
        b.data_mut()[0] = 9.0;
        assert_eq!(a.data()[0], 9.0);
        assert!(a.same_storage(&b));
    }

    #[test]
    fn test_detached_is_independent() {
        let a = Tensor::from_vec(vec![1.0, 2.0], true);
        let b = a.detached();
        b.data_mut()[0] = 9.0;
        assert_eq!(a.data()[0], 1.0);
        assert!(!a.same_storage(&b));
        assert!(b.requires_grad());
    }

    #[test]
    fn test_grad_lifecycle() {
        let t = Tensor::zeros(3, true);
        assert!(t.grad().is_none());

        t.set_grad(arr1(&[1.0, 2.0, 3.0]));
        assert_eq!(t.grad().unwrap()[1], 2.0);

        t.accumulate_grad(&arr1(&[1.0, 1.0, 1.0]));
        assert_eq!(t.grad().unwrap()[1], 3.0);

        t.zero_grad();
        assert!(t.grad().is_none());
    }

    #[test]
    fn test_accumulate_initializes() {
        let t = Tensor::zeros(2, true);
        t.accumulate_grad(&arr1(&[0.5, 0.5]));
        assert_eq!(t.grad().unwrap()[0], 0.5);
    }

    #[test]
    fn test_requires_grad_toggle() {
        let t = Tensor::zeros(2, true);
        assert!(t.requires_grad());
        t.set_requires_grad(false);
        assert!(!t.requires_grad());
    }
}
