pub(crate) mod account;
pub(crate) mod check;
pub(crate) mod meta;
pub(crate) mod migrate;
pub(crate) mod output;
pub(crate) mod repos;
pub(crate) mod sources;
pub(crate) mod sync;
