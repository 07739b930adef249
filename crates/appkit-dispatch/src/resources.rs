//! Shared application resources.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;

/// Type-keyed container for application-lifetime state.
///
/// The application fills it while building (settings store, extension
/// registry, user state) and hands it to every command through
/// [`CommandContext::resources`](crate::CommandContext::resources) and to
/// every command factory. It is shared behind an `Rc` and read-only after
/// construction; store `RefCell<T>` or `Rc<RefCell<T>>` for state that
/// commands need to mutate.
///
/// ```rust
/// use std::cell::RefCell;
/// use appkit_dispatch::Resources;
///
/// struct ApiClient { base_url: String }
///
/// let mut resources = Resources::new();
/// resources.insert(ApiClient { base_url: "https://api.example.com".into() });
/// resources.insert(RefCell::new(0u32));
///
/// let api = resources.get_required::<ApiClient>()?;
/// assert_eq!(api.base_url, "https://api.example.com");
///
/// *resources.get_required::<RefCell<u32>>()?.borrow_mut() += 1;
/// # Ok::<(), anyhow::Error>(())
/// ```
#[derive(Default)]
pub struct Resources {
    map: HashMap<TypeId, Box<dyn Any>>,
}

impl Resources {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a value, replacing and returning any previous value of the same type.
    pub fn insert<T: 'static>(&mut self, val: T) -> Option<T> {
        self.map
            .insert(TypeId::of::<T>(), Box::new(val))
            .and_then(|boxed| boxed.downcast().ok().map(|b| *b))
    }

    pub fn get<T: 'static>(&self) -> Option<&T> {
        self.map
            .get(&TypeId::of::<T>())
            .and_then(|boxed| boxed.downcast_ref())
    }

    /// Like [`get`](Self::get), but a missing value is an error naming the type.
    pub fn get_required<T: 'static>(&self) -> Result<&T, anyhow::Error> {
        self.get::<T>().ok_or_else(|| {
            anyhow::anyhow!(
                "resource missing: type {} not registered",
                std::any::type_name::<T>()
            )
        })
    }

    pub fn contains<T: 'static>(&self) -> bool {
        self.map.contains_key(&TypeId::of::<T>())
    }
}

impl fmt::Debug for Resources {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resources")
            .field("types", &self.map.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[derive(Debug, PartialEq)]
    struct Name(&'static str);

    #[test]
    fn test_insert_and_get() {
        let mut res = Resources::new();
        assert!(!res.contains::<Name>());

        assert_eq!(res.insert(Name("a")), None);
        assert_eq!(res.insert(Name("b")), Some(Name("a")));
        assert_eq!(res.get::<Name>(), Some(&Name("b")));
    }

    #[test]
    fn test_get_required_missing() {
        let res = Resources::new();
        let err = res.get_required::<Name>().unwrap_err();
        assert!(err.to_string().contains("Name"));
    }

    #[test]
    fn test_interior_mutability() {
        let mut res = Resources::new();
        res.insert(RefCell::new(vec![1]));

        res.get::<RefCell<Vec<i32>>>().unwrap().borrow_mut().push(2);
        assert_eq!(*res.get::<RefCell<Vec<i32>>>().unwrap().borrow(), vec![1, 2]);
    }
}
