//! Builder helpers for install settings structs

/// Generates `new`, `Default` and one `with_<field>` setter per listed
/// field. The struct must also carry `event_sender: Option<EventSender>`,
/// which starts empty and gets `with_event_sender` / `with_optional_sender`.
#[macro_export]
macro_rules! context_builder {
    ($name:ident { $($field:ident: $ty:ty = $default:expr),* $(,)? }) => {
        impl $name {
            pub fn new() -> Self {
                Self {
                    $($field: $default,)*
                    event_sender: None,
                }
            }

            #[must_use]
            pub fn with_event_sender(self, sender: $crate::EventSender) -> Self {
                self.with_optional_sender(Some(sender))
            }

            #[must_use]
            pub fn with_optional_sender(mut self, sender: Option<$crate::EventSender>) -> Self {
                self.event_sender = sender;
                self
            }
        }

        $crate::context_builder!(@setters $name { $($field: $ty),* });

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }
    };

    (@setters $name:ident { $($field:ident: $ty:ty),* }) => {
        paste::paste! {
            impl $name {
                $(
                    #[must_use]
                    pub fn [<with_ $field>](mut self, value: $ty) -> Self {
                        self.$field = value;
                        self
                    }
                )*
            }
        }
    };
}
