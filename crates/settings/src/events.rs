use chatrelay_common::UserId;

/// Administrative signals from the hosting platform's settings surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingsEvent {
    /// A user enabled the extension for their account.
    EnabledByUser { user_id: UserId },
    /// Tenant-level extension settings changed. The bridge's registration
    /// is no longer valid and it must log out and wait to be restarted.
    TenantSettingsChanged,
}
