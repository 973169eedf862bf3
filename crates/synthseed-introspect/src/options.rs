/// Options that control how introspection behaves.
#[derive(Debug, Clone, Default)]
pub struct IntrospectOptions {
    /// Schema to inspect on PostgreSQL. Defaults to the connection schema.
    pub schema: Option<String>,
    /// Treat a failing table as fatal instead of continuing without
    /// constraint information.
    pub strict: bool,
}

impl IntrospectOptions {
    pub fn strict() -> Self {
        Self {
            strict: true,
            ..Self::default()
        }
    }
}
