mod normal;

pub(super) use normal::handle_key;
