use trellis_core::Component;

/// Groups children. A named container can prefix its children's ids.
#[derive(Debug, Clone, Default)]
pub struct Container {
    naming_context: bool,
}

impl Container {
    pub fn new() -> Self {
        Self::default()
    }

    /// A container whose id prefixes the ids of everything inside it.
    pub fn naming() -> Self {
        Self {
            naming_context: true,
        }
    }
}

impl Component for Container {
    fn kind(&self) -> &'static str {
        "container"
    }

    fn is_naming_context(&self) -> bool {
        self.naming_context
    }
}
