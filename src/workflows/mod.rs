pub mod autoapply;
