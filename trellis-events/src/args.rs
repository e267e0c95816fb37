//! Event arguments

use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// A single type-erased event argument.
pub type ArgValue = Arc<dyn Any + Send + Sync>;

/// Ordered argument list carried by a published event.
///
/// Cloning is cheap (one reference count bump), so the same arguments can be
/// handed to every listener of a publish call and moved onto other threads.
/// The empty list is the default for a publish without arguments.
#[derive(Clone, Default)]
pub struct EventArgs {
    values: Arc<Vec<ArgValue>>,
}

impl EventArgs {
    /// Create an empty argument list
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a value
    ///
    /// # Examples
    ///
    /// ```
    /// use trellis_events::EventArgs;
    ///
    /// let args = EventArgs::new().with("report.txt").with(42u32);
    /// assert_eq!(args.get_str(0), Some("report.txt"));
    /// assert_eq!(args.get::<u32>(1), Some(&42));
    /// ```
    pub fn with<T: Any + Send + Sync>(self, value: T) -> Self {
        self.with_shared(Arc::new(value))
    }

    /// Append an already shared value
    pub fn with_shared(mut self, value: ArgValue) -> Self {
        Arc::make_mut(&mut self.values).push(value);
        self
    }

    /// Number of arguments
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the list is empty
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Downcast the argument at `index`
    pub fn get<T: Any>(&self, index: usize) -> Option<&T> {
        self.values.get(index).and_then(|v| v.downcast_ref::<T>())
    }

    /// Read the argument at `index` as a string slice.
    ///
    /// Accepts both `String` and `&'static str` values.
    pub fn get_str(&self, index: usize) -> Option<&str> {
        let value = self.values.get(index)?;
        if let Some(s) = value.downcast_ref::<String>() {
            return Some(s.as_str());
        }
        value.downcast_ref::<&'static str>().copied()
    }

    /// Shared handle to the argument at `index`
    pub fn get_shared(&self, index: usize) -> Option<&ArgValue> {
        self.values.get(index)
    }

    /// Iterate over the raw values
    pub fn iter(&self) -> impl Iterator<Item = &ArgValue> {
        self.values.iter()
    }
}

impl fmt::Debug for EventArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventArgs")
            .field("len", &self.values.len())
            .finish()
    }
}

impl From<()> for EventArgs {
    fn from(_: ()) -> Self {
        Self::new()
    }
}

impl From<Vec<ArgValue>> for EventArgs {
    fn from(values: Vec<ArgValue>) -> Self {
        Self {
            values: Arc::new(values),
        }
    }
}

impl FromIterator<ArgValue> for EventArgs {
    fn from_iter<I: IntoIterator<Item = ArgValue>>(iter: I) -> Self {
        Self::from(iter.into_iter().collect::<Vec<_>>())
    }
}

/// Build an [`EventArgs`] list from a sequence of values.
///
/// ```
/// use trellis_events::event_args;
///
/// let args = event_args!["x", 7i64];
/// assert_eq!(args.len(), 2);
/// assert!(event_args![].is_empty());
/// ```
#[macro_export]
macro_rules! event_args {
    () => {
        $crate::EventArgs::new()
    };
    ($($value:expr),+ $(,)?) => {
        $crate::EventArgs::new()$(.with($value))+
    };
}
