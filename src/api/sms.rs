use super::{require, Api};
use crate::domain::{AccessLevel, MobileNumber};
use crate::error::ApiError;
use crate::models::{Principal, SmsMessage};

impl Api {
    /// Queues a text message from `nick` to `mobile`.
    #[tracing::instrument(name = "Send sms", skip(self, caller, message))]
    pub fn sms_send(
        &self,
        caller: &Principal,
        nick: &str,
        mobile: &str,
        message: &str,
    ) -> Result<SmsMessage, ApiError> {
        require(caller, AccessLevel::Admin)?;
        let nick = self.clean_user_nick(nick)?;
        let mobile = MobileNumber::parse(mobile)?;
        let sms = SmsMessage {
            sender: nick.to_string(),
            mobile: mobile.to_string(),
            message: message.to_string(),
        };
        self.store.write().sms_outbox.push(sms.clone());
        Ok(sms)
    }

    pub fn sms_outbox(&self, caller: &Principal) -> Result<Vec<SmsMessage>, ApiError> {
        require(caller, AccessLevel::Admin)?;
        Ok(self.store.read().sms_outbox.clone())
    }
}
