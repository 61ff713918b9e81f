//! Property lenses
//!
//! A [`Lens`] is a bound accessor for one property of an element. Lenses compose: a lens
//! onto a sub-element followed by a lens on that sub-element's property yields a lens on
//! the root element whose [`PropertyPath`] is the concatenation of both paths. Two lenses
//! address the same property exactly when their paths are equal.

use smallvec::SmallVec;
use std::fmt;
use std::rc::Rc;

/// Resolved path of a property relative to a root element.
///
/// Segments are static names supplied when a lens is declared. The empty path addresses
/// the element itself.
#[derive(Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PropertyPath {
    segments: SmallVec<[&'static str; 4]>,
}

impl PropertyPath {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn new(segment: &'static str) -> Self {
        let mut segments = SmallVec::new();
        segments.push(segment);
        Self { segments }
    }

    pub fn from_segments(segments: &[&'static str]) -> Self {
        Self {
            segments: segments.iter().copied().collect(),
        }
    }

    /// Append `other` to this path.
    pub fn join(&self, other: &PropertyPath) -> Self {
        let mut segments = self.segments.clone();
        segments.extend(other.segments.iter().copied());
        Self { segments }
    }

    pub fn segments(&self) -> &[&'static str] {
        &self.segments
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Whether `self` begins with every segment of `prefix`.
    pub fn starts_with(&self, prefix: &PropertyPath) -> bool {
        self.segments.starts_with(&prefix.segments)
    }
}

impl fmt::Display for PropertyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return f.write_str("self");
        }
        for (index, segment) in self.segments.iter().enumerate() {
            if index > 0 {
                f.write_str(".")?;
            }
            f.write_str(segment)?;
        }
        Ok(())
    }
}

impl fmt::Debug for PropertyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PropertyPath({self})")
    }
}

type Getter<E, V> = Rc<dyn Fn(&E) -> &V>;
type MutGetter<E, V> = Rc<dyn Fn(&mut E) -> &mut V>;

/// A bound accessor for a value of type `V` reachable from an element of type `E`.
pub struct Lens<E: ?Sized, V: ?Sized> {
    path: PropertyPath,
    get: Getter<E, V>,
    get_mut: MutGetter<E, V>,
}

impl<E: ?Sized + 'static, V: ?Sized + 'static> Lens<E, V> {
    /// Declare a lens for a single named property.
    ///
    /// ```
    /// use marionette_core::Lens;
    ///
    /// struct Layer { opacity: f64 }
    ///
    /// let opacity = Lens::new("opacity", |l: &Layer| &l.opacity, |l: &mut Layer| &mut l.opacity);
    /// let mut layer = Layer { opacity: 1.0 };
    /// *opacity.get_mut(&mut layer) = 0.5;
    /// assert_eq!(*opacity.get(&layer), 0.5);
    /// ```
    pub fn new<G, M>(name: &'static str, get: G, get_mut: M) -> Self
    where
        G: Fn(&E) -> &V + 'static,
        M: Fn(&mut E) -> &mut V + 'static,
    {
        Self::from_parts(PropertyPath::new(name), get, get_mut)
    }

    fn from_parts<G, M>(path: PropertyPath, get: G, get_mut: M) -> Self
    where
        G: Fn(&E) -> &V + 'static,
        M: Fn(&mut E) -> &mut V + 'static,
    {
        Self {
            path,
            get: Rc::new(get),
            get_mut: Rc::new(get_mut),
        }
    }

    pub fn path(&self) -> &PropertyPath {
        &self.path
    }

    pub fn get<'a>(&self, element: &'a E) -> &'a V {
        (self.get)(element)
    }

    pub fn get_mut<'a>(&self, element: &'a mut E) -> &'a mut V {
        (self.get_mut)(element)
    }

    /// Compose this lens with a lens on the value it addresses.
    pub fn then<W: ?Sized + 'static>(&self, inner: &Lens<V, W>) -> Lens<E, W> {
        let outer_get = Rc::clone(&self.get);
        let inner_get = Rc::clone(&inner.get);
        let outer_get_mut = Rc::clone(&self.get_mut);
        let inner_get_mut = Rc::clone(&inner.get_mut);
        Lens::from_parts(
            self.path.join(&inner.path),
            move |element| inner_get(outer_get(element)),
            move |element| inner_get_mut(outer_get_mut(element)),
        )
    }
}

impl<E: ?Sized + 'static> Lens<E, E> {
    /// The lens addressing the element itself.
    pub fn identity() -> Self {
        Self::from_parts(PropertyPath::root(), |element| element, |element| element)
    }
}

impl<E: ?Sized, V: ?Sized> Clone for Lens<E, V> {
    fn clone(&self) -> Self {
        Self {
            path: self.path.clone(),
            get: Rc::clone(&self.get),
            get_mut: Rc::clone(&self.get_mut),
        }
    }
}

impl<E: ?Sized, V: ?Sized> fmt::Debug for Lens<E, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lens").field("path", &self.path).finish()
    }
}

impl<E: ?Sized, V: ?Sized> PartialEq for Lens<E, V> {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path
    }
}
