use crate::domain::user::User;

/// Effective employment-info lock: the user's own setting wins over the global one.
pub fn employment_info_locked(global_lock: bool, user: &User) -> bool {
    user.employment_info.is_employment_info_locked.unwrap_or(global_lock)
}

pub fn can_update_employment_info(global_lock: bool, user: &User) -> bool {
    !employment_info_locked(global_lock, user)
}

/// Local half of an optimistic lock toggle: apply, then commit or roll back.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LockToggle {
    previous: Option<bool>,
    next: bool,
}

impl LockToggle {
    /// Flips the user's effective lock in place and remembers how to undo it.
    pub fn apply(user: &mut User, global_lock: bool) -> Self {
        let previous = user.employment_info.is_employment_info_locked;
        let next = !employment_info_locked(global_lock, user);
        user.employment_info.is_employment_info_locked = Some(next);
        Self { previous, next }
    }

    pub fn requested(&self) -> bool {
        self.next
    }

    pub fn rollback(self, user: &mut User) {
        user.employment_info.is_employment_info_locked = self.previous;
    }
}

#[cfg(test)]
mod tests {
    use super::{can_update_employment_info, employment_info_locked, LockToggle};
    use crate::domain::user::fixtures::user;
    use crate::domain::user::Role;

    #[test]
    fn individual_unlock_overrides_global_lock() {
        let mut staff = user("u-1", Role::Staff);
        staff.employment_info.is_employment_info_locked = Some(false);

        assert!(can_update_employment_info(true, &staff));
    }

    #[test]
    fn individual_lock_overrides_global_unlock() {
        let mut staff = user("u-1", Role::Staff);
        staff.employment_info.is_employment_info_locked = Some(true);

        assert!(!can_update_employment_info(false, &staff));
    }

    #[test]
    fn global_setting_applies_without_individual_override() {
        let staff = user("u-1", Role::Staff);
        assert!(employment_info_locked(true, &staff));
        assert!(!employment_info_locked(false, &staff));
    }

    #[test]
    fn toggle_applies_locally_and_rolls_back_to_the_previous_setting() {
        let mut staff = user("u-1", Role::Staff);

        let toggle = LockToggle::apply(&mut staff, true);
        assert!(!toggle.requested());
        assert_eq!(staff.employment_info.is_employment_info_locked, Some(false));

        toggle.rollback(&mut staff);
        assert_eq!(staff.employment_info.is_employment_info_locked, None);
    }
}
