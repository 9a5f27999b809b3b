pub use self::group::{Division, Group, GroupId};
pub use self::guide::{Guide, GuideId};
pub use self::member::{Member, MemberId};
pub use self::parameter::{EvaluationParameter, InvalidParameter, ParameterDraft, ParameterId};

mod group;
mod guide;
mod member;
mod parameter;
