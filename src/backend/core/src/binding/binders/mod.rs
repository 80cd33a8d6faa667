//! Reference binders for scalars, collections and composite objects.

mod collection;
mod complex;
mod simple;

pub use collection::{CollectionBinderProvider, CollectionModelBinder};
pub use complex::{ComplexTypeBinderProvider, ComplexTypeModelBinder};
pub use simple::{SimpleTypeBinderProvider, SimpleTypeModelBinder};
