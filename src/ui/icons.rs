pub struct Icons;

impl Icons {
    pub const PACKAGE: &str = "📦";
    pub const IMAGE: &str = "🖼️";
    pub const CHECK: &str = "✅";
    pub const CROSS: &str = "❌";
    pub const WARN: &str = "⚠️";
    pub const INFO: &str = "ℹ️";
}
