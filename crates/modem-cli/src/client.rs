//! Typed client for the `modemd` RPC protocol.
//!
//! One [`ModemClient`] wraps one connection, and therefore one daemon
//! session: at most one modem is open at a time, and opening another closes
//! the previous one.

use std::io::{Read, Write};

use modem_rpc::{
    DeviceInfo, FirmwareVersion, Frame, Function, Operator, Payload, PinChange,
    RegistrationState, SignalQuality, WwanProfile, WwanState, decode_operators, encode_text,
    read_frame, text_until_nul, write_frame,
};

use crate::ClientError;

/// RPC client over any byte stream connected to the daemon.
#[derive(Debug)]
pub struct ModemClient<S> {
    stream: S,
}

impl<S: Read + Write> ModemClient<S> {
    /// Wraps a connected stream.
    pub fn new(stream: S) -> Self {
        Self { stream }
    }

    /// Sends one request and returns the success payload.
    ///
    /// An empty reply payload is the daemon's failure signal and surfaces as
    /// [`ClientError::Failed`].
    pub fn call(&mut self, function: Function, payload: Vec<u8>) -> Result<Vec<u8>, ClientError> {
        let name = function.name();
        write_frame(&mut self.stream, &Frame::query(name, payload))
            .map_err(|source| ClientError::Send { function: name, source })?;
        let reply = read_frame(&mut self.stream)
            .map_err(|source| ClientError::Receive { function: name, source })?
            .ok_or(ClientError::Closed { function: name })?;
        if reply.name() != name.as_bytes() {
            return Err(ClientError::Mismatch {
                function: name,
                received: String::from_utf8_lossy(reply.name()).into_owned(),
            });
        }
        if reply.payload().is_empty() {
            return Err(ClientError::Failed { function: name });
        }
        Ok(reply.into_payload())
    }

    fn call_typed<T: Payload>(
        &mut self,
        function: Function,
        payload: Vec<u8>,
    ) -> Result<T, ClientError> {
        let bytes = self.call(function, payload)?;
        T::from_bytes(&bytes).map_err(|source| ClientError::Decode {
            function: function.name(),
            source,
        })
    }

    fn call_text(&mut self, function: Function, payload: Vec<u8>) -> Result<String, ClientError> {
        self.call(function, payload)
            .map(|bytes| text_until_nul(&bytes))
    }

    fn call_unit(&mut self, function: Function) -> Result<(), ClientError> {
        self.call(function, Vec::new()).map(drop)
    }

    fn discovered(&mut self, function: Function) -> Result<Option<DeviceInfo>, ClientError> {
        match self.call_typed(function, Vec::new()) {
            Ok(device) => Ok(Some(device)),
            Err(ClientError::Failed { .. }) => Ok(None),
            Err(error) => Err(error),
        }
    }

    /// Starts discovery; `None` when no recognised modem is attached.
    pub fn find_first(&mut self) -> Result<Option<DeviceInfo>, ClientError> {
        self.discovered(Function::FindFirst)
    }

    /// Next recognised modem; `None` once the snapshot is exhausted.
    pub fn find_next(&mut self) -> Result<Option<DeviceInfo>, ClientError> {
        self.discovered(Function::FindNext)
    }

    /// Drops the discovery snapshot.
    pub fn find_close(&mut self) -> Result<(), ClientError> {
        // An empty payload is the normal reply here.
        match self.call_unit(Function::FindClose) {
            Err(ClientError::Failed { .. }) | Ok(()) => Ok(()),
            Err(error) => Err(error),
        }
    }

    /// Opens the modem on `port` for this session and returns its handle id.
    pub fn open_by_port(&mut self, port: &str) -> Result<u32, ClientError> {
        self.call_typed(Function::OpenByPort, encode_text(port))
    }

    /// Releases the session's modem.
    pub fn close(&mut self) -> Result<(), ClientError> {
        match self.call_unit(Function::Close) {
            Err(ClientError::Failed { .. }) | Ok(()) => Ok(()),
            Err(error) => Err(error),
        }
    }

    /// Identity of the open modem.
    pub fn info(&mut self) -> Result<DeviceInfo, ClientError> {
        self.call_typed(Function::GetInfo, Vec::new())
    }

    /// Sticky error code of the open modem.
    pub fn last_error(&mut self) -> Result<i32, ClientError> {
        self.call_typed(Function::GetLastError, Vec::new())
    }

    pub fn imei(&mut self) -> Result<String, ClientError> {
        self.call_text(Function::GetImei, Vec::new())
    }

    pub fn imsi(&mut self) -> Result<String, ClientError> {
        self.call_text(Function::GetImsi, Vec::new())
    }

    pub fn operator_name(&mut self) -> Result<String, ClientError> {
        self.call_text(Function::GetOperatorName, Vec::new())
    }

    pub fn network_type(&mut self) -> Result<String, ClientError> {
        self.call_text(Function::GetNetworkType, Vec::new())
    }

    pub fn signal_quality(&mut self) -> Result<SignalQuality, ClientError> {
        self.call_typed(Function::GetSignalQuality, Vec::new())
    }

    /// Network time as Unix seconds.
    pub fn network_time(&mut self) -> Result<i64, ClientError> {
        self.call_typed(Function::GetNetworkTime, Vec::new())
    }

    pub fn network_registration(&mut self) -> Result<RegistrationState, ClientError> {
        self.call_typed(Function::NetworkRegistration, Vec::new())
    }

    pub fn firmware_version(&mut self) -> Result<FirmwareVersion, ClientError> {
        self.call_typed(Function::GetFwVersion, Vec::new())
    }

    pub fn cell_id(&mut self) -> Result<i32, ClientError> {
        self.call_typed(Function::GetCellId, Vec::new())
    }

    pub fn change_pin(&mut self, request: &PinChange) -> Result<(), ClientError> {
        self.call_typed::<PinChange>(Function::ChangePin, request.to_bytes())
            .map(drop)
    }

    /// Runs a blocking operator scan.
    pub fn operator_scan(&mut self) -> Result<Vec<Operator>, ClientError> {
        let bytes = self.call(Function::OperatorScan, Vec::new())?;
        decode_operators(&bytes).map_err(|source| ClientError::Decode {
            function: Function::OperatorScan.name(),
            source,
        })
    }

    /// Starts a background scan writing JSON to `output` on the daemon host.
    pub fn operator_scan_start(&mut self, output: &str) -> Result<(), ClientError> {
        self.call_typed::<i32>(Function::OperatorScanStart, encode_text(output))
            .map(drop)
    }

    pub fn operator_scan_is_running(&mut self) -> Result<bool, ClientError> {
        self.call_typed::<i8>(Function::OperatorScanIsRunning, Vec::new())
            .map(|running| running != 0)
    }

    /// Sends a raw AT command and returns the modem's answer.
    pub fn at_command(&mut self, command: &str) -> Result<String, ClientError> {
        self.call_text(Function::AtCommand, encode_text(command))
    }

    pub fn ussd(&mut self, request: &str) -> Result<String, ClientError> {
        self.call_text(Function::UssdCmd, encode_text(request))
    }

    /// Rebinds the open modem's AT channel.
    pub fn reload(&mut self) -> Result<(), ClientError> {
        match self.call_unit(Function::ConfReload) {
            Err(ClientError::Failed { .. }) | Ok(()) => Ok(()),
            Err(error) => Err(error),
        }
    }

    pub fn set_wwan_profile(&mut self, profile: &WwanProfile) -> Result<(), ClientError> {
        self.call_typed::<WwanProfile>(Function::SetWwanProfile, profile.to_bytes())
            .map(drop)
    }

    pub fn start_wwan(&mut self) -> Result<(), ClientError> {
        self.call_typed::<i32>(Function::StartWwan, Vec::new())
            .map(drop)
    }

    pub fn stop_wwan(&mut self) -> Result<(), ClientError> {
        self.call_typed::<i32>(Function::StopWwan, Vec::new())
            .map(drop)
    }

    pub fn wwan_state(&mut self) -> Result<WwanState, ClientError> {
        self.call_typed(Function::StateWwan, Vec::new())
    }
}
