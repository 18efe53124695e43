//! Concrete components for Trellis trees.
//!
//! Every widget here is stateless: per-session state lives in the node's
//! model and is reached through the overlay contract of `trellis-core`.

pub mod check_box;
pub mod container;
pub mod dropdown;
pub mod number_field;
pub mod text;
pub mod text_field;
pub mod validators;

#[cfg(test)]
mod test_support;

pub use check_box::CheckBox;
pub use container::Container;
pub use dropdown::{Dropdown, DropdownOption};
pub use number_field::NumberField;
pub use text::Text;
pub use text_field::TextField;
pub use validators::{MaxLength, Pattern, Range};

use trellis_core::ComponentModel;

/// Model settings shared by the input widgets' builders.
#[derive(Debug, Clone, Default)]
pub(crate) struct InputDefaults {
    label: Option<String>,
    mandatory: bool,
    bean_property: Option<String>,
}

impl InputDefaults {
    pub(crate) fn apply(&self, model: &mut ComponentModel) {
        model.set_label(self.label.clone());
        model.mandatory = self.mandatory;
        model.bean_property = self.bean_property.clone();
    }
}

macro_rules! input_builders {
    ($widget:ty) => {
        impl $widget {
            pub fn label(mut self, label: impl Into<String>) -> Self {
                self.defaults.label = Some(label.into());
                self
            }

            pub fn mandatory(mut self) -> Self {
                self.defaults.mandatory = true;
                self
            }

            /// Binds the value to `property` of the node's bean, or of the
            /// enclosing row bean inside a repeater.
            pub fn bound_to(mut self, property: impl Into<String>) -> Self {
                self.defaults.bean_property = Some(property.into());
                self
            }
        }
    };
}

pub(crate) use input_builders;
