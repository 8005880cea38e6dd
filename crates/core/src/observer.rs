/// Receives solver events and decides how the iteration should proceed.
///
/// Observers let callers monitor or steer a solver without changing its API,
/// enabling logging, early stopping, or custom control policies.
///
/// The `observe` method returns `Option<A>`, where `Some(action)` requests a
/// solver-specific action and `None` lets the solver continue unchanged.
///
/// Closures automatically implement `Observer`, and a built-in impl for `()`
/// provides a no-op observer that always returns `None`.
pub trait Observer<E, A> {
    /// Observes a solver event and optionally returns a control action.
    fn observe(&mut self, event: &E) -> Option<A>;
}

impl<E, A, F> Observer<E, A> for F
where
    F: FnMut(&E) -> Option<A>,
{
    fn observe(&mut self, event: &E) -> Option<A> {
        self(event)
    }
}

/// A no-op observer that always returns `None`.
impl<E, A> Observer<E, A> for () {
    fn observe(&mut self, _event: &E) -> Option<A> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drive<O: Observer<f64, &'static str>>(observer: &mut O, values: &[f64]) -> Option<&'static str> {
        values.iter().find_map(|v| observer.observe(v))
    }

    #[test]
    fn closures_are_observers() {
        let mut seen = Vec::new();
        let mut observer = |v: &f64| {
            seen.push(*v);
            (*v < 0.1).then_some("stop")
        };

        assert_eq!(drive(&mut observer, &[1.0, 0.5, 0.05, 0.01]), Some("stop"));
        assert_eq!(seen, vec![1.0, 0.5, 0.05]);
    }

    #[test]
    fn unit_never_acts() {
        assert_eq!(drive(&mut (), &[1.0, -1.0]), None);
    }
}
