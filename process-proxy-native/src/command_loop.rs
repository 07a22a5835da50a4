//! The native endpoint's single-threaded, blocking command loop (§4.3).

use std::io::Read;
use std::net::TcpStream;

use process_proxy_wire::Opcode;

use crate::error::exit_code;
use crate::handlers::Handlers;

/// Reads and serves commands until end-of-stream, a fatal protocol error,
/// or an EXIT command completes. Returns the process exit code: the
/// EXIT-supplied code if one was processed, `exit_code::CLEAN` otherwise.
pub fn run(mut stream: TcpStream, mut handlers: Handlers) -> i32 {
    loop {
        let mut opcode_byte = [0u8; 1];
        match stream.read_exact(&mut opcode_byte) {
            Ok(()) => {}
            Err(_) => break, // end-of-stream or transport error: exit cleanly
        };

        let opcode = match Opcode::try_from(opcode_byte[0]) {
            Ok(opcode) => opcode,
            Err(e) => {
                tracing::error!(byte = opcode_byte[0], error = %e, "unknown opcode, closing");
                break;
            }
        };

        tracing::trace!(?opcode, "dispatching command");

        let result = dispatch(opcode, &mut stream, &mut handlers);
        if let Err(e) = result {
            tracing::error!(?opcode, error = %e, "fatal error serving command");
            break;
        }

        if let Some(code) = handlers.exit_code() {
            tracing::info!(code, "exit requested, stopping command loop");
            return code;
        }
    }

    let _ = stream.shutdown(std::net::Shutdown::Both);
    exit_code::CLEAN
}

fn dispatch(
    opcode: Opcode,
    stream: &mut TcpStream,
    handlers: &mut Handlers,
) -> Result<(), process_proxy_wire::WireError> {
    match opcode {
        Opcode::GetArgs => handlers.get_args(stream),
        Opcode::ReadInput => handlers.read_input(stream),
        Opcode::WriteOut => handlers.write_out(stream),
        Opcode::WriteErr => handlers.write_err(stream),
        Opcode::GetCwd => handlers.get_cwd(stream),
        Opcode::GetEnv => handlers.get_env(stream),
        Opcode::Exit => handlers.exit(stream).map(|_| ()),
        Opcode::CloseInput => handlers.close_input(stream),
        Opcode::CloseOut => handlers.close_out(stream),
        Opcode::CloseErr => handlers.close_err(stream),
        Opcode::IsInputConnected => handlers.is_input_connected(stream),
    }
}
