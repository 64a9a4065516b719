// handlers/protected/mod.rs - Handlers behind the Basic auth layer
//
// Every handler here receives the caller's SecurityContext explicitly and
// passes it down to the repository; nothing reads identity from globals.
pub mod books;
