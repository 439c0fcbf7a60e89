//! Message type numbering and the entity each message addresses.

use c32_core::EntityKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum MessageType {
    Ping = 0,
    ControllerInfo = 1,
    TaskInfo = 2,
    CircuitInfo = 3,
    FunctionInfo = 4,
    GetMemData = 5,
    SetMemData = 6,
    MonitoringEnable = 7,
    MonitoringDisable = 8,
    MonitoringReport = 9,
    CreateTask = 10,
    CreateCircuit = 11,
    CreateFunction = 12,
    DeleteTask = 13,
    DeleteCircuit = 14,
    DeleteFunction = 15,
    TaskStart = 16,
    TaskStop = 17,
    TaskSetInterval = 18,
    TaskSetOffset = 19,
    TaskAddCircuit = 20,
    TaskRemoveCircuit = 21,
    CircuitAddFunction = 22,
    CircuitRemoveFunction = 23,
    CircuitReorderFunction = 24,
    CircuitConnectOutput = 25,
    FunctionSetIoValue = 26,
    FunctionSetIoFlag = 27,
    FunctionConnectInput = 28,
    FunctionDisconnectInput = 29,
    FunctionSetFlags = 30,
    FunctionSetFlag = 31,
    FunctionClearFlag = 32,
}

/// What the target field of a request must name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// Target is ignored.
    None,
    Entity(EntityKind),
    /// Controller to client only.
    Outbound,
}

impl MessageType {
    pub const ALL: [MessageType; 33] = [
        Self::Ping,
        Self::ControllerInfo,
        Self::TaskInfo,
        Self::CircuitInfo,
        Self::FunctionInfo,
        Self::GetMemData,
        Self::SetMemData,
        Self::MonitoringEnable,
        Self::MonitoringDisable,
        Self::MonitoringReport,
        Self::CreateTask,
        Self::CreateCircuit,
        Self::CreateFunction,
        Self::DeleteTask,
        Self::DeleteCircuit,
        Self::DeleteFunction,
        Self::TaskStart,
        Self::TaskStop,
        Self::TaskSetInterval,
        Self::TaskSetOffset,
        Self::TaskAddCircuit,
        Self::TaskRemoveCircuit,
        Self::CircuitAddFunction,
        Self::CircuitRemoveFunction,
        Self::CircuitReorderFunction,
        Self::CircuitConnectOutput,
        Self::FunctionSetIoValue,
        Self::FunctionSetIoFlag,
        Self::FunctionConnectInput,
        Self::FunctionDisconnectInput,
        Self::FunctionSetFlags,
        Self::FunctionSetFlag,
        Self::FunctionClearFlag,
    ];

    pub fn from_u32(raw: u32) -> Option<Self> {
        Self::ALL.get(raw as usize).copied()
    }

    pub fn as_u32(self) -> u32 {
        self as u32
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Ping => "PING",
            Self::ControllerInfo => "CONTROLLER_INFO",
            Self::TaskInfo => "TASK_INFO",
            Self::CircuitInfo => "CIRCUIT_INFO",
            Self::FunctionInfo => "FUNCTION_INFO",
            Self::GetMemData => "GET_MEM_DATA",
            Self::SetMemData => "SET_MEM_DATA",
            Self::MonitoringEnable => "MONITORING_ENABLE",
            Self::MonitoringDisable => "MONITORING_DISABLE",
            Self::MonitoringReport => "MONITORING_REPORT",
            Self::CreateTask => "CREATE_TASK",
            Self::CreateCircuit => "CREATE_CIRCUIT",
            Self::CreateFunction => "CREATE_FUNCTION",
            Self::DeleteTask => "DELETE_TASK",
            Self::DeleteCircuit => "DELETE_CIRCUIT",
            Self::DeleteFunction => "DELETE_FUNCTION",
            Self::TaskStart => "TASK_START",
            Self::TaskStop => "TASK_STOP",
            Self::TaskSetInterval => "TASK_SET_INTERVAL",
            Self::TaskSetOffset => "TASK_SET_OFFSET",
            Self::TaskAddCircuit => "TASK_ADD_CIRCUIT",
            Self::TaskRemoveCircuit => "TASK_REMOVE_CIRCUIT",
            Self::CircuitAddFunction => "CIRCUIT_ADD_FUNCTION",
            Self::CircuitRemoveFunction => "CIRCUIT_REMOVE_FUNCTION",
            Self::CircuitReorderFunction => "CIRCUIT_REORDER_FUNCTION",
            Self::CircuitConnectOutput => "CIRCUIT_CONNECT_OUTPUT",
            Self::FunctionSetIoValue => "FUNCTION_SET_IO_VALUE",
            Self::FunctionSetIoFlag => "FUNCTION_SET_IO_FLAG",
            Self::FunctionConnectInput => "FUNCTION_CONNECT_INPUT",
            Self::FunctionDisconnectInput => "FUNCTION_DISCONNECT_INPUT",
            Self::FunctionSetFlags => "FUNCTION_SET_FLAGS",
            Self::FunctionSetFlag => "FUNCTION_SET_FLAG",
            Self::FunctionClearFlag => "FUNCTION_CLEAR_FLAG",
        }
    }

    pub fn target(self) -> Target {
        use EntityKind::*;
        match self {
            Self::Ping | Self::ControllerInfo => Target::None,
            Self::MonitoringReport => Target::Outbound,
            Self::CreateTask | Self::CreateCircuit | Self::CreateFunction => {
                Target::Entity(Controller)
            }
            Self::TaskInfo
            | Self::DeleteTask
            | Self::TaskStart
            | Self::TaskStop
            | Self::TaskSetInterval
            | Self::TaskSetOffset
            | Self::TaskAddCircuit
            | Self::TaskRemoveCircuit => Target::Entity(Task),
            Self::CircuitInfo
            | Self::DeleteCircuit
            | Self::CircuitAddFunction
            | Self::CircuitRemoveFunction
            | Self::CircuitReorderFunction
            | Self::CircuitConnectOutput => Target::Entity(Circuit),
            Self::FunctionInfo
            | Self::GetMemData
            | Self::SetMemData
            | Self::MonitoringEnable
            | Self::MonitoringDisable
            | Self::DeleteFunction
            | Self::FunctionSetIoValue
            | Self::FunctionSetIoFlag
            | Self::FunctionConnectInput
            | Self::FunctionDisconnectInput
            | Self::FunctionSetFlags
            | Self::FunctionSetFlag
            | Self::FunctionClearFlag => Target::Entity(Function),
        }
    }

    /// Ping and controller info need no target.
    pub fn is_address_free(self) -> bool {
        self.target() == Target::None
    }
}

impl core::fmt::Display for MessageType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}
