mod acl;
mod signature;

pub use acl::{AclMiddlewareFactory, AclMiddlewareService};
pub use signature::{
    decode_callback,
    parse_signature,
    verify_callback,
    CallbackRejection,
    CallbackSignatureFactory,
    CallbackSignatureService,
    SIGNATURE_HEADER,
};
