use super::{existing_actor, require, require_owner, Api};
use crate::domain::AccessLevel;
use crate::error::ApiError;
use crate::models::{KeyValue, Principal};

impl Api {
    pub fn keyvalue_put(
        &self,
        caller: &Principal,
        nick: &str,
        keyname: &str,
        value: &str,
    ) -> Result<KeyValue, ApiError> {
        require(caller, AccessLevel::Write)?;
        let nick = self.clean_nick(nick)?;
        if keyname.is_empty() {
            return Err(ApiError::InvalidArguments("keyname must not be empty".into()));
        }
        let mut db = self.store.write();
        require_owner(&db, caller, nick.as_str())?;
        existing_actor(&db, &nick)?;
        let keyvalue = KeyValue {
            actor: nick.to_string(),
            keyname: keyname.to_string(),
            value: value.to_string(),
        };
        db.keyvalues
            .insert((nick.to_string(), keyname.to_string()), keyvalue.clone());
        Ok(keyvalue)
    }

    pub fn keyvalue_get(
        &self,
        caller: &Principal,
        nick: &str,
        keyname: &str,
    ) -> Result<Option<KeyValue>, ApiError> {
        require(caller, AccessLevel::Read)?;
        let nick = self.clean_nick(nick)?;
        let db = self.store.read();
        require_owner(&db, caller, nick.as_str())?;
        Ok(db
            .keyvalues
            .get(&(nick.to_string(), keyname.to_string()))
            .cloned())
    }

    /// Values of `nick` whose key starts with `prefix`, ordered by key.
    pub fn keyvalue_prefix_list(
        &self,
        caller: &Principal,
        nick: &str,
        prefix: &str,
    ) -> Result<Vec<KeyValue>, ApiError> {
        require(caller, AccessLevel::Read)?;
        let nick = self.clean_nick(nick)?;
        let db = self.store.read();
        require_owner(&db, caller, nick.as_str())?;
        Ok(db
            .keyvalues
            .range((nick.to_string(), prefix.to_string())..)
            .take_while(|((actor, key), _)| {
                actor == nick.as_str() && key.starts_with(prefix)
            })
            .map(|(_, keyvalue)| keyvalue.clone())
            .collect())
    }
}
